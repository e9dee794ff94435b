//! Live Document Tree
//!
//! An arena-backed HTML tree standing in for the browser document the
//! reconciler patches.
//!
//! # Ownership
//!
//! The tree owns every node. Everything else (locator results, resolved
//! scopes, pending swaps) holds plain `NodeId`s, which stay valid for the
//! lifetime of the tree: detached nodes are kept in the arena and ids are
//! never reused. A full reload replaces the whole tree.
//!
//! # Modules
//!
//! - `parse` - `tl` markup → arena nodes (page source and sanitized imports)
//! - `serialize` - arena nodes → HTML
//! - `style` - inline `display` handling for hide/reveal

mod parse;
mod serialize;
mod style;

use thiserror::Error;

// =============================================================================
// Node Types
// =============================================================================

/// Index of a node in a [`DocumentTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Element name and attributes.
///
/// Attributes are kept sorted by name: `tl` does not preserve source order,
/// and a canonical order keeps serialization deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .binary_search_by(|(k, _)| k.as_str().cmp(name))
            .ok()
            .map(|i| self.attrs[i].1.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.binary_search_by(|(k, _)| k.as_str().cmp(name)) {
            Ok(i) => self.attrs[i].1 = value,
            Err(i) => self.attrs.insert(i, (name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attrs
            .binary_search_by(|(k, _)| k.as_str().cmp(name))
            .ok()
            .map(|i| self.attrs.remove(i).1)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document { doctype: Option<String> },
    Element(Element),
    /// Raw source text (entities are kept as written).
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Tree operation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("markup could not be parsed: {0}")]
    Parse(String),

    #[error("node {0:?} has no parent")]
    NoParent(NodeId),

    #[error("inserting {child:?} next to {anchor:?} would create a cycle")]
    Cycle { anchor: NodeId, child: NodeId },
}

// =============================================================================
// DocumentTree
// =============================================================================

/// The live document.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: Vec<Node>,
    document: NodeId,
    page_root: Option<NodeId>,
}

impl DocumentTree {
    /// Create an empty document (no page root).
    pub fn empty() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document { doctype: None },
                parent: None,
                children: Vec::new(),
            }],
            document: NodeId(0),
            page_root: None,
        }
    }

    /// The document node.
    #[inline]
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// The element currently bound as page root (`main` by default).
    #[inline]
    pub fn page_root(&self) -> Option<NodeId> {
        self.page_root
    }

    /// Rebind the page root (after a whole-page swap).
    pub fn set_page_root(&mut self, root: NodeId) {
        self.page_root = Some(root);
    }

    /// Number of nodes ever allocated, detached ones included.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    // -------------------------------------------------------------------------
    // Node access
    // -------------------------------------------------------------------------

    #[inline]
    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id).data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id).data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Set an attribute. No-op on non-element nodes.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|el| el.remove_attr(name))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|el| el.has_class(class))
    }

    /// Add a class if not already present.
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        if el.has_class(class) {
            return;
        }
        let value = match el.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        el.set_attr("class", value);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        if !el.has_class(class) {
            return;
        }
        let value: Vec<&str> = el.classes().filter(|c| *c != class).collect();
        let value = value.join(" ");
        if value.is_empty() {
            el.remove_attr("class");
        } else {
            el.set_attr("class", value);
        }
    }

    /// Overwrite an element's name and attributes, e.g. to restore a copy
    /// taken with `element(id).cloned()`. No-op on non-element nodes.
    pub fn restore_element(&mut self, id: NodeId, element: Element) {
        if let Some(el) = self.element_mut(id) {
            *el = element;
        }
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|c| self.is_element(*c))
    }

    /// Iterate `id` and its ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    /// `id` and every node below it, in document order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is reachable from the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.document, id)
    }

    /// Elements in the subtree of `scope` (inclusive) whose attribute `name`
    /// equals `value`, in document order.
    pub fn find_all_by_attr(&self, scope: NodeId, name: &str, value: &str) -> Vec<NodeId> {
        self.subtree(scope)
            .into_iter()
            .filter(|id| self.attr(*id, name) == Some(value))
            .collect()
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        self.subtree(id)
            .into_iter()
            .filter_map(|n| match self.data(n) {
                NodeData::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeData::Element(Element::new(name)))
    }

    /// Create a detached text node (raw HTML text).
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()))
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Remove a node (and its subtree) from its parent. The node stays in the
    /// arena and can be re-inserted.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != id);
        }
    }

    fn check_cycle(&self, anchor: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.contains(child, anchor) {
            return Err(DomError::Cycle { anchor, child });
        }
        Ok(())
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_cycle(parent, child)?;
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
        Ok(())
    }

    /// Insert `child` immediately after `anchor` (`insertAdjacentElement('afterend')`).
    pub fn insert_after(&mut self, anchor: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_adjacent(anchor, child, 1)
    }

    /// Insert `child` immediately before `anchor`.
    pub fn insert_before(&mut self, anchor: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_adjacent(anchor, child, 0)
    }

    fn insert_adjacent(
        &mut self,
        anchor: NodeId,
        child: NodeId,
        offset: usize,
    ) -> Result<(), DomError> {
        let parent = self.parent(anchor).ok_or(DomError::NoParent(anchor))?;
        self.check_cycle(anchor, child)?;
        self.detach(child);
        let siblings = &self.node(parent).children;
        let pos = siblings
            .iter()
            .position(|c| *c == anchor)
            .ok_or(DomError::NoParent(anchor))?;
        self.node_mut(parent).children.insert(pos + offset, child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Wrap `id` in `wrapper`: the wrapper takes the node's place and the node
    /// becomes its last child.
    pub fn wrap(&mut self, id: NodeId, wrapper: NodeId) -> Result<(), DomError> {
        self.insert_before(id, wrapper)?;
        self.append_child(wrapper, id)
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::empty()
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    tree: &'a DocumentTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

// =============================================================================
// Tests
// =============================================================================
