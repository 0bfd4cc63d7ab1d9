use super::*;

const ACTION_STACK_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug)]
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    pub(crate) menu: MenuState,
    pub(crate) platform: PlatformSupport,
    pub(crate) active_element: Option<NodeId>,
    pub(crate) trace: bool,
    trace_logs: Vec<String>,
    trace_log_limit: usize,
    trace_to_stderr: bool,
}

impl Page {
    /// Builds a page from an HTML fragment and dispatches `DOMContentLoaded`,
    /// which binds the menu trigger handlers. Call [`Page::initialize_menus`]
    /// to rebind after mutating trigger markup.
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = parse_html(html)?;
        let mut page = Self {
            dom,
            listeners: ListenerStore::default(),
            menu: MenuState::default(),
            platform: PlatformSupport::default(),
            active_element: None,
            trace: false,
            trace_logs: Vec::new(),
            trace_log_limit: 10_000,
            trace_to_stderr: true,
        };

        let root = page.dom.root;
        page.listeners.add(
            root,
            "DOMContentLoaded".into(),
            Listener {
                capture: false,
                handler: Handler::DocumentReady,
            },
        );
        page.dispatch_event(root, "DOMContentLoaded")?;
        Ok(page)
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace_logs)
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_to_stderr = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::MenuRuntime(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_log_limit = max_entries;
        while self.trace_logs.len() > self.trace_log_limit {
            self.trace_logs.remove(0);
        }
        Ok(())
    }

    pub fn platform_support(&self) -> &PlatformSupport {
        &self.platform
    }

    pub fn platform_support_mut(&mut self) -> &mut PlatformSupport {
        &mut self.platform
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK_BYTES, || self.click_node(target))
    }

    /// Clicks a node handle directly; the node may be detached from the
    /// document.
    pub fn click_element(&mut self, target: NodeId) -> Result<()> {
        if self.dom.nodes.get(target.0).is_none() {
            return Err(Error::MenuRuntime(format!("unknown node: {}", target.0)));
        }
        stacker::grow(ACTION_STACK_BYTES, || self.click_node(target))
    }

    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK_BYTES, || {
            self.dispatch_event(target, event).map(|_| ())
        })
    }

    pub fn focus(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK_BYTES, || self.focus_node(target))
    }

    pub fn blur(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK_BYTES, || self.blur_node(target))
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.active_element
    }

    pub fn create_detached_element(&mut self, tag_name: &str) -> NodeId {
        self.dom.create_detached_element(tag_name.to_string())
    }

    pub fn select_all(&self, selector: &str) -> Result<NodeList> {
        Ok(NodeList::from_ids(self.dom.query_selector_all(selector)?))
    }

    pub fn node_id(&self, selector: &str) -> Result<NodeId> {
        self.select_one(selector)
    }

    /// Selector matching through the compatibility chain (native matchers in
    /// probe order, then the parent-scan fallback).
    pub fn element_matches(&mut self, node: NodeId, selector: &str) -> Result<bool> {
        let (matched, route) = shim::matches(&self.dom, &self.platform, node, selector)?;
        if self.trace {
            let label = self.trace_node_label(node);
            self.trace_line(format!(
                "[match] selector={selector} node={label} route={} matched={matched}",
                route.label()
            ));
        }
        Ok(matched)
    }

    pub fn for_each<'a, F>(&self, list: &'a NodeList, callback: F) -> &'a NodeList
    where
        F: FnMut(NodeId, usize, &NodeList),
    {
        shim::for_each(list, callback)
    }

    pub fn remove_class<'a>(
        &mut self,
        list: &'a NodeList,
        class_name: &str,
    ) -> Result<&'a NodeList> {
        shim::remove_class(&mut self.dom, list, class_name)
    }

    pub fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let node = self.select_one(selector)?;
        Ok(self.dom.attr(node, name).map(ToOwned::to_owned))
    }

    pub fn has_class(&self, selector: &str, class_name: &str) -> Result<bool> {
        let node = self.select_one(selector)?;
        self.dom.class_contains(node, class_name)
    }

    pub fn text(&self, selector: &str) -> Result<String> {
        let node = self.select_one(selector)?;
        Ok(self.dom.text_content(node))
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.dom.document_element()
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        self.select_one(selector).map(|_| ())
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let node = self.select_one(selector)?;
        let actual = self.dom.text_content(node);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.into(),
                expected: expected.into(),
                actual,
                dom_snippet: self.dom.dom_snippet(node),
            });
        }
        Ok(())
    }

    pub fn assert_attr(&self, selector: &str, name: &str, expected: &str) -> Result<()> {
        let node = self.select_one(selector)?;
        let actual = self.dom.attr(node, name).unwrap_or("<absent>").to_string();
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.into(),
                expected: expected.into(),
                actual,
                dom_snippet: self.dom.dom_snippet(node),
            });
        }
        Ok(())
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.into()))
    }

    fn click_node(&mut self, target: NodeId) -> Result<()> {
        if self.dom.attr(target, "disabled").is_some() {
            return Ok(());
        }

        let outcome = self.dispatch_event(target, "click")?;
        if outcome.default_prevented {
            return Ok(());
        }

        // Default action kept from the platform: a label with a `for`
        // attribute focuses its associated control.
        if self
            .dom
            .tag_name(target)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("label"))
        {
            if let Some(for_id) = self.dom.attr(target, "for").map(ToOwned::to_owned) {
                if let Some(control) = self.dom.by_id(&for_id) {
                    self.focus_node(control)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> Result<EventState> {
        let mut event = EventState::new(event_type, target);

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }
        path.reverse();

        if path.is_empty() {
            self.trace_event_done(&event, "empty_path");
            return Ok(event);
        }

        // Capture phase.
        if path.len() >= 2 {
            for node in &path[..path.len() - 1] {
                event.current_target = *node;
                self.invoke_listeners(*node, &mut event, true)?;
                if event.propagation_stopped {
                    self.trace_event_done(&event, "propagation_stopped");
                    return Ok(event);
                }
            }
        }

        // Target phase: capture listeners first.
        event.current_target = target;
        self.invoke_listeners(target, &mut event, true)?;
        if event.propagation_stopped {
            self.trace_event_done(&event, "propagation_stopped");
            return Ok(event);
        }

        // Target phase: bubble listeners.
        self.invoke_listeners(target, &mut event, false)?;
        if event.propagation_stopped {
            self.trace_event_done(&event, "propagation_stopped");
            return Ok(event);
        }

        // Bubble phase.
        if path.len() >= 2 {
            for node in path[..path.len() - 1].iter().rev() {
                event.current_target = *node;
                self.invoke_listeners(*node, &mut event, false)?;
                if event.propagation_stopped {
                    self.trace_event_done(&event, "propagation_stopped");
                    return Ok(event);
                }
            }
        }

        self.trace_event_done(&event, "completed");
        Ok(event)
    }

    fn invoke_listeners(
        &mut self,
        node_id: NodeId,
        event: &mut EventState,
        capture: bool,
    ) -> Result<()> {
        let listeners = self.listeners.get(node_id, &event.event_type, capture);
        for listener in listeners {
            if self.trace {
                let phase = if capture { "capture" } else { "bubble" };
                let target_label = self.trace_node_label(event.target);
                let current_label = self.trace_node_label(event.current_target);
                self.trace_line(format!(
                    "[event] {} handler={} target={} current={} phase={} default_prevented={}",
                    event.event_type,
                    listener.handler.label(),
                    target_label,
                    current_label,
                    phase,
                    event.default_prevented
                ));
            }
            self.run_handler(listener.handler, event)?;
            if event.immediate_propagation_stopped {
                break;
            }
        }
        Ok(())
    }

    fn run_handler(&mut self, handler: Handler, event: &mut EventState) -> Result<()> {
        match handler {
            Handler::DocumentReady => self.initialize_menus(),
            Handler::MenuTrigger => self.on_trigger_click(event),
            Handler::OutsideClick => self.on_outside_click(event),
        }
    }

    pub(crate) fn focus_node(&mut self, node: NodeId) -> Result<()> {
        if self.dom.attr(node, "disabled").is_some() {
            return Ok(());
        }

        if self.active_element == Some(node) {
            return Ok(());
        }

        if let Some(current) = self.active_element {
            self.blur_node(current)?;
        }

        self.active_element = Some(node);
        self.dispatch_event(node, "focusin")?;
        self.dispatch_event(node, "focus")?;
        Ok(())
    }

    pub(crate) fn blur_node(&mut self, node: NodeId) -> Result<()> {
        if self.active_element != Some(node) {
            return Ok(());
        }

        self.dispatch_event(node, "focusout")?;
        self.dispatch_event(node, "blur")?;
        self.active_element = None;
        Ok(())
    }

    fn trace_event_done(&mut self, event: &EventState, outcome: &str) {
        if !self.trace {
            return;
        }
        let target_label = self.trace_node_label(event.target);
        let current_label = self.trace_node_label(event.current_target);
        self.trace_line(format!(
            "[event] done {} target={} current={} outcome={} default_prevented={} propagation_stopped={} immediate_stopped={}",
            event.event_type,
            target_label,
            current_label,
            outcome,
            event.default_prevented,
            event.propagation_stopped,
            event.immediate_propagation_stopped
        ));
    }

    pub(crate) fn trace_line(&mut self, line: String) {
        if self.trace_to_stderr {
            eprintln!("{line}");
        }
        self.trace_logs.push(line);
        while self.trace_logs.len() > self.trace_log_limit {
            self.trace_logs.remove(0);
        }
    }

    pub(crate) fn trace_node_label(&self, node: NodeId) -> String {
        if let Some(id) = self.dom.attr(node, "id") {
            return format!("#{id}");
        }
        match self.dom.nodes.get(node.0).map(|n| &n.node_type) {
            Some(NodeType::Element(element)) => element.tag_name.clone(),
            Some(NodeType::Text(_)) => "#text".into(),
            Some(NodeType::Document) => "#document".into(),
            None => "#invalid".into(),
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self, selector: &str, event: &str, capture: bool) -> Result<usize> {
        let node = self.select_one(selector)?;
        Ok(self.listeners.count(node, event, capture))
    }

    #[cfg(test)]
    pub(crate) fn document_capture_click_count(&self) -> usize {
        match self.dom.document_element() {
            Some(node) => self.listeners.count(node, "click", true),
            None => 0,
        }
    }
}
