//! Scope Resolver
//!
//! Decides how much of the page an update replaces. The decision is a pure
//! function over the marks of the located node and its ancestors, so the
//! precedence rules can be exercised without building a tree:
//!
//! | Order | Condition                                      | Scope        |
//! |-------|------------------------------------------------|--------------|
//! | 1     | located node is the page root                  | `whole-page` |
//! | 2     | nearest widget boundary (ancestor-or-self)     | `widget`     |
//! | 3     | nearest section boundary (ancestor-or-self)    | `section`    |
//! | 4     | otherwise                                      | `fragment`   |
//!
//! Boundaries above the page root never count.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::MarkupConfig;
use crate::dom::{DocumentTree, NodeId};

use super::SanitizedMarkup;

/// Replacement granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeKind {
    WholePage,
    Widget,
    Section,
    Fragment,
}

impl ScopeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WholePage => "whole-page",
            Self::Widget => "widget",
            Self::Section => "section",
            Self::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the resolver needs to know about one node on the ancestor path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeMarks<'a> {
    pub is_page_root: bool,
    pub is_widget: bool,
    pub is_section: bool,
    pub resource: Option<&'a str>,
}

/// Resolve over `path` (located node first, then its ancestors).
///
/// Returns the scope and the index into `path` of the boundary node.
/// An empty path resolves to a fragment at index 0.
pub fn resolve(path: &[NodeMarks<'_>]) -> (ScopeKind, usize) {
    if path.first().is_some_and(|m| m.is_page_root) {
        return (ScopeKind::WholePage, 0);
    }

    // Everything from the page root upwards is outside the editable area.
    let within = path
        .iter()
        .position(|m| m.is_page_root)
        .map_or(path, |root| &path[..root]);

    let boundary = |pred: fn(&NodeMarks<'_>) -> bool| {
        within
            .iter()
            .position(|m| pred(m) && m.resource.is_some_and(|r| !r.is_empty()))
    };

    if let Some(i) = boundary(|m| m.is_widget) {
        return (ScopeKind::Widget, i);
    }
    if let Some(i) = boundary(|m| m.is_section) {
        return (ScopeKind::Section, i);
    }
    (ScopeKind::Fragment, 0)
}

/// Build the mark path for `node` and resolve it.
///
/// Returns the scope, the boundary node, and the boundary's resource id
/// (`None` only when a fragment node is instrumented through rich-text
/// attributes alone).
pub fn resolve_in(
    tree: &DocumentTree,
    markup: &MarkupConfig,
    node: NodeId,
) -> (ScopeKind, NodeId, Option<String>) {
    let page_root = tree.page_root();
    let nodes: Vec<NodeId> = tree.ancestors(node).filter(|n| tree.is_element(*n)).collect();
    let path: Vec<NodeMarks<'_>> = nodes
        .iter()
        .map(|n| NodeMarks {
            is_page_root: Some(*n) == page_root,
            is_widget: tree.has_class(*n, &markup.block_class),
            is_section: tree.has_class(*n, &markup.section_class),
            resource: tree
                .attr(*n, &markup.resource_attr)
                .or_else(|| tree.attr(*n, &markup.richtext_resource_attr)),
        })
        .collect();

    let (kind, index) = resolve(&path);
    let boundary = nodes.get(index).copied().unwrap_or(node);
    let resource = path
        .get(index)
        .and_then(|m| m.resource)
        .map(str::to_string);
    (kind, boundary, resource)
}

/// Result of scope resolution for one update record.
#[derive(Debug, Clone)]
pub struct ResolvedScope {
    pub kind: ScopeKind,
    /// The live node that will be replaced (the old node).
    pub live_node: NodeId,
    /// Resource id of `live_node`, used to find its counterpart in the
    /// replacement markup.
    pub boundary_resource: String,
    /// Filled in once the record's markup has passed the gate.
    pub replacement: Option<SanitizedMarkup>,
}

impl ResolvedScope {
    /// Resolve the scope for a located node. `located_id` is used as the
    /// boundary resource when the boundary itself carries none.
    pub fn resolve(
        tree: &DocumentTree,
        markup: &MarkupConfig,
        located: NodeId,
        located_id: &str,
    ) -> Self {
        let (kind, live_node, resource) = resolve_in(tree, markup, located);
        Self {
            kind,
            live_node,
            boundary_resource: resource.unwrap_or_else(|| located_id.to_string()),
            replacement: None,
        }
    }

    pub fn with_replacement(mut self, markup: SanitizedMarkup) -> Self {
        self.replacement = Some(markup);
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn marks(is_widget: bool, is_section: bool, resource: Option<&str>) -> NodeMarks<'_> {
        NodeMarks {
            is_page_root: false,
            is_widget,
            is_section,
            resource,
        }
    }

    fn root() -> NodeMarks<'static> {
        NodeMarks {
            is_page_root: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_page_root_is_whole_page() {
        assert_eq!(resolve(&[root()]), (ScopeKind::WholePage, 0));
    }

    #[test]
    fn test_widget_inside_section_is_widget() {
        let path = [
            marks(false, false, None),
            marks(true, false, Some("urn:w")),
            marks(false, true, Some("urn:s")),
            root(),
        ];
        assert_eq!(resolve(&path), (ScopeKind::Widget, 1));
    }

    #[test]
    fn test_section_without_widget() {
        let path = [
            marks(false, false, Some("urn:text")),
            marks(false, true, Some("urn:s")),
            root(),
        ];
        assert_eq!(resolve(&path), (ScopeKind::Section, 1));
    }

    #[test]
    fn test_boundary_requires_resource() {
        let path = [
            marks(false, false, Some("urn:text")),
            marks(true, false, None),
            marks(false, true, None),
            root(),
        ];
        assert_eq!(resolve(&path), (ScopeKind::Fragment, 0));
    }

    #[test]
    fn test_boundaries_above_page_root_ignored() {
        let path = [
            marks(false, false, Some("urn:text")),
            root(),
            marks(true, false, Some("urn:outer")),
        ];
        assert_eq!(resolve(&path), (ScopeKind::Fragment, 0));
    }

    #[test]
    fn test_resolve_in_tree() {
        let tree = DocumentTree::parse(
            r#"<main><div class="section" data-aue-resource="urn:s"><div class="teaser block" data-aue-resource="urn:w"><h2 data-aue-resource="urn:h">x</h2></div><p data-aue-resource="urn:p">y</p></div></main>"#,
            "main",
        )
        .unwrap();
        let markup = MarkupConfig::default();
        let h2 = tree.find_all_by_attr(tree.document(), "data-aue-resource", "urn:h")[0];
        let p = tree.find_all_by_attr(tree.document(), "data-aue-resource", "urn:p")[0];

        let scope = ResolvedScope::resolve(&tree, &markup, h2, "urn:h");
        assert_eq!(scope.kind, ScopeKind::Widget);
        assert_eq!(scope.boundary_resource, "urn:w");
        assert!(tree.has_class(scope.live_node, "teaser"));

        let scope = ResolvedScope::resolve(&tree, &markup, p, "urn:p");
        assert_eq!(scope.kind, ScopeKind::Section);
        assert_eq!(scope.boundary_resource, "urn:s");

        let root = tree.page_root().unwrap();
        let scope = ResolvedScope::resolve(&tree, &markup, root, "urn:page");
        assert_eq!(scope.kind, ScopeKind::WholePage);
        assert_eq!(scope.live_node, root);
        assert_eq!(scope.boundary_resource, "urn:page");
    }

    #[test]
    fn test_scope_kind_serde() {
        assert_eq!(
            serde_json::to_string(&ScopeKind::WholePage).unwrap(),
            "\"whole-page\""
        );
        assert_eq!(ScopeKind::Fragment.to_string(), "fragment");
    }
}
