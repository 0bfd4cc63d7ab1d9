use super::*;

/// A fixed-at-query-time snapshot of matched nodes, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeList {
    items: Vec<NodeId>,
}

impl NodeList {
    pub(crate) fn from_ids(items: Vec<NodeId>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<NodeId> {
        self.items.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.items.iter().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchRoute {
    Native(MatcherKind),
    Fallback,
}

impl MatchRoute {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Native(kind) => kind.label(),
            Self::Fallback => "parent-scan",
        }
    }
}

/// Selector matching with the compatibility chain: the first available
/// native matcher wins; with none available, fall back to enumerating the
/// parent's matching descendants and testing identity membership.
pub(crate) fn matches(
    dom: &Dom,
    support: &PlatformSupport,
    node: NodeId,
    selector: &str,
) -> Result<(bool, MatchRoute)> {
    for kind in MatcherKind::PROBE_ORDER {
        if support.supports(kind) {
            // All native variants share the one engine; what varies across
            // real platforms is availability, not semantics.
            let matched = dom.matches_selector(node, selector)?;
            return Ok((matched, MatchRoute::Native(kind)));
        }
    }

    let Some(parent) = dom.parent(node) else {
        // Detached: no parent to scan, so the element is not found.
        return Ok((false, MatchRoute::Fallback));
    };

    let candidates = dom.query_selector_all_from(&parent, selector)?;
    let mut i = candidates.len();
    while i > 0 {
        i -= 1;
        if candidates[i] == node {
            return Ok((true, MatchRoute::Fallback));
        }
    }
    Ok((false, MatchRoute::Fallback))
}

/// Applies `callback(node, index, list)` to every item of the snapshot, in
/// index order, and returns the list for chaining.
pub(crate) fn for_each<'a, F>(list: &'a NodeList, mut callback: F) -> &'a NodeList
where
    F: FnMut(NodeId, usize, &NodeList),
{
    for (index, node) in list.items.iter().enumerate() {
        callback(*node, index, list);
    }
    list
}

/// Removes `class_name` from every element in the list. Absence is not an
/// error; an empty class name is a no-op. Returns the list for chaining.
pub(crate) fn remove_class<'a>(
    dom: &mut Dom,
    list: &'a NodeList,
    class_name: &str,
) -> Result<&'a NodeList> {
    if class_name.is_empty() {
        return Ok(list);
    }
    for node in list.iter() {
        if dom.element(node).is_some() {
            dom.class_remove(node, class_name)?;
        }
    }
    Ok(list)
}
