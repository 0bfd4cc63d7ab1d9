use super::*;

const SHIM_FIXTURE: &str = r#"
    <nav id='bar'>
        <button id='t1' data-menu='menuA'>open</button>
    </nav>
    <div id='menuA' class='dropdown active'>content</div>
    <div id='menuB' class='dropdown'>content</div>
    <p id='plain'>text</p>
"#;

#[test]
fn for_each_visits_in_index_order_and_chains() -> Result<()> {
    let page = Page::from_html(SHIM_FIXTURE)?;
    let list = page.select_all(".dropdown")?;
    assert_eq!(list.len(), 2);

    let mut seen = Vec::new();
    let returned = page.for_each(&list, |node, index, traversed| {
        assert_eq!(traversed.len(), list.len());
        seen.push((index, node));
    });

    assert_eq!(returned, &list);
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], (0, page.node_id("#menuA")?));
    assert_eq!(seen[1], (1, page.node_id("#menuB")?));
    Ok(())
}

#[test]
fn for_each_on_empty_list_is_a_noop() -> Result<()> {
    let page = Page::from_html(SHIM_FIXTURE)?;
    let list = page.select_all(".missing")?;
    assert!(list.is_empty());

    let mut calls = 0usize;
    page.for_each(&list, |_, _, _| calls += 1);
    assert_eq!(calls, 0);
    Ok(())
}

#[test]
fn remove_class_clears_the_class_everywhere() -> Result<()> {
    let mut page = Page::from_html(SHIM_FIXTURE)?;
    let list = page.select_all(".dropdown")?;

    let returned = page.remove_class(&list, "active")?;
    assert_eq!(returned.len(), list.len());

    assert!(!page.has_class("#menuA", "active")?);
    assert!(!page.has_class("#menuB", "active")?);
    assert!(page.has_class("#menuA", "dropdown")?);

    // Removing again changes nothing further.
    page.remove_class(&list, "active")?;
    assert_eq!(page.attr("#menuA", "class")?, Some("dropdown".into()));
    assert_eq!(page.attr("#menuB", "class")?, Some("dropdown".into()));
    Ok(())
}

#[test]
fn remove_class_with_empty_name_is_a_noop() -> Result<()> {
    let mut page = Page::from_html(SHIM_FIXTURE)?;
    let list = page.select_all(".dropdown")?;

    page.remove_class(&list, "")?;
    assert!(page.has_class("#menuA", "active")?);
    Ok(())
}

#[test]
fn matcher_routes_agree_for_well_formed_selectors() -> Result<()> {
    let selectors = [
        "#menuA.active",
        "[data-menu]",
        "div.dropdown",
        "nav button",
        "#menuA.active, #menuB.active",
        "p",
    ];

    let mut page = Page::from_html(SHIM_FIXTURE)?;
    let nodes: Vec<NodeId> = page
        .select_all("*")?
        .iter()
        .collect();

    // Reference results with every native matcher available.
    let mut reference = Vec::new();
    for node in &nodes {
        for selector in selectors {
            reference.push(page.element_matches(*node, selector)?);
        }
    }

    // Knock native matchers out one at a time, ending with the parent-scan
    // fallback; every configuration must agree with the reference run.
    let knockouts = [
        MatcherKind::Standard,
        MatcherKind::Moz,
        MatcherKind::Ms,
        MatcherKind::O,
        MatcherKind::Webkit,
    ];
    for kind in knockouts {
        page.platform_support_mut().disable(kind);
        let mut results = Vec::new();
        for node in &nodes {
            for selector in selectors {
                results.push(page.element_matches(*node, selector)?);
            }
        }
        assert_eq!(results, reference, "after disabling {kind:?}");
    }

    assert!(!page.platform_support().supports(MatcherKind::Webkit));
    Ok(())
}

#[test]
fn fallback_scans_the_parent_for_identity() -> Result<()> {
    let mut page = Page::from_html(SHIM_FIXTURE)?;
    page.platform_support_mut().disable_all();

    let content = page.node_id("#menuA")?;
    assert!(page.element_matches(content, "#menuA.active")?);
    assert!(!page.element_matches(content, "#menuB.active")?);

    let trigger = page.node_id("#t1")?;
    assert!(page.element_matches(trigger, "[data-menu='menuA']")?);
    Ok(())
}

#[test]
fn fallback_reports_no_match_for_detached_elements() -> Result<()> {
    let mut page = Page::from_html(SHIM_FIXTURE)?;
    page.platform_support_mut().disable_all();

    let detached = page.create_detached_element("div");
    assert!(!page.element_matches(detached, "div")?);
    Ok(())
}

#[test]
fn malformed_selectors_propagate_from_every_route() -> Result<()> {
    let mut page = Page::from_html(SHIM_FIXTURE)?;
    let node = page.node_id("#plain")?;

    match page.element_matches(node, ":hover") {
        Err(Error::UnsupportedSelector(_)) => {}
        other => panic!("expected unsupported selector, got: {other:?}"),
    }

    page.platform_support_mut().disable_all();
    match page.element_matches(node, ":hover") {
        Err(Error::UnsupportedSelector(_)) => {}
        other => panic!("expected unsupported selector, got: {other:?}"),
    }
    Ok(())
}

#[test]
fn match_routes_show_up_in_trace_logs() -> Result<()> {
    let mut page = Page::from_html(SHIM_FIXTURE)?;
    page.enable_trace(true);
    page.set_trace_stderr(false);

    let node = page.node_id("#menuA")?;
    page.element_matches(node, ".dropdown")?;
    let logs = page.take_trace_logs();
    assert!(
        logs.iter().any(|line| line.contains("route=matches")),
        "missing native route in: {logs:?}"
    );

    page.platform_support_mut().disable_all();
    page.element_matches(node, ".dropdown")?;
    let logs = page.take_trace_logs();
    assert!(
        logs.iter().any(|line| line.contains("route=parent-scan")),
        "missing fallback route in: {logs:?}"
    );

    // Re-enabling a vendor variant routes through it again.
    page.platform_support_mut().enable(MatcherKind::Webkit);
    page.element_matches(node, ".dropdown")?;
    let logs = page.take_trace_logs();
    assert!(
        logs.iter()
            .any(|line| line.contains("route=webkitMatchesSelector")),
        "missing vendor route in: {logs:?}"
    );
    Ok(())
}
