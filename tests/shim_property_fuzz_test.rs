use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseResult};
use ui_menu::Page;

const SHIM_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/shim_property_fuzz_test.txt";
const DEFAULT_SHIM_PROPTEST_CASES: u32 = 128;

const CLASS_POOL: [&str; 6] = ["alpha", "beta", "gamma", "delta", "wide", "compact"];

fn env_proptest_cases(var_name: &str, default_cases: u32) -> u32 {
    std::env::var(var_name)
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default_cases)
}

fn shim_proptest_cases() -> u32 {
    std::env::var("UI_MENU_SHIM_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or_else(|| {
            env_proptest_cases("UI_MENU_PROPTEST_CASES", DEFAULT_SHIM_PROPTEST_CASES)
        })
}

fn document_strategy() -> BoxedStrategy<Vec<Vec<usize>>> {
    vec(vec(0usize..CLASS_POOL.len(), 0..=4), 1..=8).boxed()
}

fn selector_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just("div".to_string()),
        (0usize..CLASS_POOL.len()).prop_map(|ix| format!(".{}", CLASS_POOL[ix])),
        (0usize..CLASS_POOL.len()).prop_map(|ix| format!("div.{}", CLASS_POOL[ix])),
        (0usize..8).prop_map(|i| format!("#n{i}")),
        (0usize..CLASS_POOL.len(), 0usize..CLASS_POOL.len())
            .prop_map(|(a, b)| format!(".{}, .{}", CLASS_POOL[a], CLASS_POOL[b])),
        (0usize..CLASS_POOL.len()).prop_map(|ix| format!("[class~='{}']", CLASS_POOL[ix])),
    ]
    .boxed()
}

fn build_html(divs: &[Vec<usize>]) -> String {
    let mut html = String::new();
    for (i, classes) in divs.iter().enumerate() {
        let names: Vec<&str> = classes.iter().map(|ix| CLASS_POOL[*ix]).collect();
        html.push_str(&format!(
            "<div id='n{i}' class='{}'></div>\n",
            names.join(" ")
        ));
    }
    html
}

fn fail(err: ui_menu::Error) -> proptest::test_runner::TestCaseError {
    proptest::test_runner::TestCaseError::fail(format!("{err:?}"))
}

fn assert_remove_class_clears_only_the_target(
    divs: &[Vec<usize>],
    target_ix: usize,
) -> TestCaseResult {
    let target = CLASS_POOL[target_ix];
    let mut page = Page::from_html(&build_html(divs)).map_err(fail)?;
    let list = page.select_all("div").map_err(fail)?;
    prop_assert_eq!(list.len(), divs.len());

    page.remove_class(&list, target).map_err(fail)?;

    for (i, classes) in divs.iter().enumerate() {
        let selector = format!("#n{i}");
        prop_assert!(
            !page.has_class(&selector, target).map_err(fail)?,
            "{selector} still carries {target}"
        );
        for ix in classes {
            let kept = CLASS_POOL[*ix];
            if kept != target {
                prop_assert!(
                    page.has_class(&selector, kept).map_err(fail)?,
                    "{selector} lost unrelated class {kept}"
                );
            }
        }
    }

    // A second removal is observationally a no-op.
    let before: Vec<Option<String>> = (0..divs.len())
        .map(|i| page.attr(&format!("#n{i}"), "class"))
        .collect::<ui_menu::Result<_>>()
        .map_err(fail)?;
    page.remove_class(&list, target).map_err(fail)?;
    let after: Vec<Option<String>> = (0..divs.len())
        .map(|i| page.attr(&format!("#n{i}"), "class"))
        .collect::<ui_menu::Result<_>>()
        .map_err(fail)?;
    prop_assert_eq!(before, after);

    Ok(())
}

fn assert_for_each_visits_every_node_once(divs: &[Vec<usize>]) -> TestCaseResult {
    let page = Page::from_html(&build_html(divs)).map_err(fail)?;
    let list = page.select_all("div").map_err(fail)?;

    let mut visited = Vec::new();
    let returned = page.for_each(&list, |node, index, traversed| {
        visited.push((index, node, traversed.len()));
    });

    prop_assert_eq!(returned, &list);
    prop_assert_eq!(visited.len(), divs.len());
    for (position, (index, node, snapshot_len)) in visited.iter().enumerate() {
        prop_assert_eq!(*index, position);
        prop_assert_eq!(*snapshot_len, divs.len());
        prop_assert_eq!(list.item(position), Some(*node));
    }

    Ok(())
}

fn assert_matcher_routes_agree(divs: &[Vec<usize>], selector: &str) -> TestCaseResult {
    let html = build_html(divs);
    let mut native = Page::from_html(&html).map_err(fail)?;
    let mut fallback = Page::from_html(&html).map_err(fail)?;
    fallback.platform_support_mut().disable_all();

    for i in 0..divs.len() {
        let id_selector = format!("#n{i}");
        let native_node = native.node_id(&id_selector).map_err(fail)?;
        let fallback_node = fallback.node_id(&id_selector).map_err(fail)?;

        let via_native = native.element_matches(native_node, selector).map_err(fail)?;
        let via_fallback = fallback
            .element_matches(fallback_node, selector)
            .map_err(fail)?;
        prop_assert_eq!(
            via_native,
            via_fallback,
            "selector {} disagrees on #n{}",
            selector,
            i
        );
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: shim_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(SHIM_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn remove_class_clears_only_the_target_class(
        divs in document_strategy(),
        target_ix in 0usize..CLASS_POOL.len(),
    ) {
        assert_remove_class_clears_only_the_target(&divs, target_ix)?;
    }

    #[test]
    fn for_each_visits_every_node_once_in_index_order(divs in document_strategy()) {
        assert_for_each_visits_every_node_once(&divs)?;
    }

    #[test]
    fn native_and_fallback_matching_agree(
        divs in document_strategy(),
        selector in selector_strategy(),
    ) {
        assert_matcher_routes_agree(&divs, &selector)?;
    }
}
