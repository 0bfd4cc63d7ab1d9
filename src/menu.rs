use super::*;

pub(crate) const ACTIVE_CLASS: &str = "active";
pub(crate) const MENU_ATTR: &str = "data-menu";
pub(crate) const ACTIVE_ELEMENT_ATTR: &str = "data-active-element";

/// Controller-owned menu state. The `data-active-element` attribute on the
/// document element is published from here; this struct is the source of
/// truth.
#[derive(Debug, Default, Clone)]
pub(crate) struct MenuState {
    pub(crate) active_menu: Option<String>,
    pub(crate) outside_listener_installed: bool,
}

impl Page {
    /// Scans for `[data-menu]` trigger elements and (re)binds their click
    /// handlers. Remove-then-add, so rebinding never duplicates a handler.
    pub fn initialize_menus(&mut self) -> Result<()> {
        let triggers = self.dom.query_selector_all(&format!("[{MENU_ATTR}]"))?;
        for node in triggers {
            self.listeners
                .remove(node, "click", false, Handler::MenuTrigger);
            self.listeners.add(
                node,
                "click".into(),
                Listener {
                    capture: false,
                    handler: Handler::MenuTrigger,
                },
            );
        }
        Ok(())
    }

    pub fn active_menu(&self) -> Option<&str> {
        self.menu.active_menu.as_deref()
    }

    pub fn outside_listener_installed(&self) -> bool {
        self.menu.outside_listener_installed
    }

    /// The published `data-active-element` attribute on the document element.
    pub fn active_element_marker(&self) -> Option<String> {
        let root = self.dom.document_element()?;
        self.dom
            .attr(root, ACTIVE_ELEMENT_ATTR)
            .map(ToOwned::to_owned)
    }

    pub fn open_menu(&mut self, menu_id: &str) -> Result<()> {
        let Some(content) = self.dom.by_id(menu_id) else {
            return Err(Error::SelectorNotFound(format!("#{menu_id}")));
        };
        self.dom.class_add(content, ACTIVE_CLASS)?;
        self.menu.active_menu = Some(menu_id.to_string());
        self.uninstall_outside_listener();
        self.install_outside_listener();
        self.publish_active_marker()?;
        if self.trace {
            self.trace_line(format!("[menu] open id={menu_id}"));
        }
        Ok(())
    }

    pub fn close_menu(&mut self, menu_id: &str) -> Result<()> {
        if let Some(content) = self.dom.by_id(menu_id) {
            self.dom.class_remove(content, ACTIVE_CLASS)?;
        }
        if self.menu.active_menu.as_deref() == Some(menu_id) {
            self.menu.active_menu = None;
            self.uninstall_outside_listener();
        }
        self.publish_active_marker()?;
        if self.trace {
            self.trace_line(format!("[menu] close id={menu_id}"));
        }
        Ok(())
    }

    pub fn close_all_menus(&mut self) -> Result<()> {
        if let Some(selector) = self.active_content_selector()? {
            let list = NodeList::from_ids(self.dom.query_selector_all(&selector)?);
            shim::remove_class(&mut self.dom, &list, ACTIVE_CLASS)?;
        }
        self.menu.active_menu = None;
        self.uninstall_outside_listener();
        self.publish_active_marker()?;
        if self.trace {
            self.trace_line("[menu] close-all".into());
        }
        Ok(())
    }

    pub(crate) fn on_trigger_click(&mut self, event: &mut EventState) -> Result<()> {
        let trigger = event.current_target;
        let Some(menu_id) = self.dom.attr(trigger, MENU_ATTR).map(ToOwned::to_owned) else {
            return Ok(());
        };

        // Missing content element: resume default click behavior.
        let Some(content) = self.dom.by_id(&menu_id) else {
            return Ok(());
        };

        // Labels keep their default action (activating the associated
        // control); every other trigger kind has it suppressed.
        if !self
            .dom
            .tag_name(trigger)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("label"))
        {
            event.default_prevented = true;
        }

        let is_active = self.dom.class_toggle(content, ACTIVE_CLASS)?;

        // Remove-then-add keeps at most one outside-click listener bound.
        self.uninstall_outside_listener();
        if is_active {
            self.menu.active_menu = Some(menu_id.clone());
            self.install_outside_listener();
        } else {
            self.menu.active_menu = None;
        }
        self.publish_active_marker()?;

        if self.trace {
            let state = if is_active { "open" } else { "closed" };
            self.trace_line(format!("[menu] toggle id={menu_id} state={state}"));
        }
        Ok(())
    }

    pub(crate) fn on_outside_click(&mut self, event: &mut EventState) -> Result<()> {
        let Some(selector) = self.active_content_selector()? else {
            // No element carries the menu attribute: nothing is left to
            // close, and an empty selector must never reach the engine.
            self.menu.active_menu = None;
            self.uninstall_outside_listener();
            self.publish_active_marker()?;
            return Ok(());
        };

        // Walk from the click target toward body. Clicks on or under a
        // trigger belong to the toggle handler, not this one. The walk is
        // explicitly bounded: the document node, the body, or a missing
        // parent ends it, so a detached target counts as outside.
        let body = self.dom.body();
        let mut cursor = Some(event.target);
        let mut inside = false;
        while let Some(node) = cursor {
            if self.dom.element(node).is_none() {
                break;
            }
            if Some(node) == body {
                break;
            }
            if self.dom.attr(node, MENU_ATTR).is_some() {
                inside = true;
                break;
            }
            let (matched, _) = shim::matches(&self.dom, &self.platform, node, &selector)?;
            if matched {
                inside = true;
                break;
            }
            cursor = self.dom.parent(node);
        }

        if self.trace {
            let label = self.trace_node_label(event.target);
            self.trace_line(format!("[menu] outside-probe target={label} inside={inside}"));
        }

        if !inside {
            let list = NodeList::from_ids(self.dom.query_selector_all(&selector)?);
            shim::remove_class(&mut self.dom, &list, ACTIVE_CLASS)?;
            self.menu.active_menu = None;
            self.uninstall_outside_listener();
            self.publish_active_marker()?;
            if self.trace {
                self.trace_line("[menu] close-all".into());
            }
        }
        Ok(())
    }

    /// One `#id.active` selector per `[data-menu]` carrier, joined with
    /// `", "`. Carriers are listed regardless of their current state.
    fn active_content_selector(&self) -> Result<Option<String>> {
        let carriers = self.dom.query_selector_all(&format!("[{MENU_ATTR}]"))?;
        let mut selectors = Vec::new();
        for node in carriers {
            if let Some(id) = self.dom.attr(node, MENU_ATTR) {
                if !id.is_empty() {
                    selectors.push(format!("#{id}.{ACTIVE_CLASS}"));
                }
            }
        }
        if selectors.is_empty() {
            return Ok(None);
        }
        Ok(Some(selectors.join(", ")))
    }

    fn install_outside_listener(&mut self) {
        let Some(anchor) = self.dom.document_element() else {
            return;
        };
        self.listeners.add(
            anchor,
            "click".into(),
            Listener {
                capture: true,
                handler: Handler::OutsideClick,
            },
        );
        self.menu.outside_listener_installed = true;
    }

    fn uninstall_outside_listener(&mut self) {
        if let Some(anchor) = self.dom.document_element() {
            self.listeners
                .remove(anchor, "click", true, Handler::OutsideClick);
        }
        self.menu.outside_listener_installed = false;
    }

    fn publish_active_marker(&mut self) -> Result<()> {
        let Some(root) = self.dom.document_element() else {
            return Ok(());
        };
        match &self.menu.active_menu {
            Some(id) => {
                let id = id.clone();
                self.dom.set_attr(root, ACTIVE_ELEMENT_ATTR, &id)
            }
            None => self.dom.remove_attr(root, ACTIVE_ELEMENT_ATTR),
        }
    }
}
