//! Inline `display` handling.
//!
//! Hiding writes `display:none` into the `style` attribute the way
//! `el.style.display = 'none'` does; revealing drops the `display`
//! declaration again and removes the attribute when nothing is left.

use super::{DocumentTree, NodeId};

const DISPLAY_NONE: &str = "display:none";

impl DocumentTree {
    /// Hide a node so inserting it causes no visible flash.
    pub fn hide(&mut self, id: NodeId) {
        let mut decls = self.style_decls(id);
        decls.retain(|d| !is_display(d));
        decls.push(DISPLAY_NONE.to_string());
        self.set_attr(id, "style", decls.join(";"));
    }

    /// Undo [`DocumentTree::hide`].
    pub fn reveal(&mut self, id: NodeId) {
        let mut decls = self.style_decls(id);
        let before = decls.len();
        decls.retain(|d| !is_display(d));
        if decls.len() == before {
            return;
        }
        if decls.is_empty() {
            self.remove_attr(id, "style");
        } else {
            self.set_attr(id, "style", decls.join(";"));
        }
    }

    /// Whether the node itself carries `display:none`.
    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.style_decls(id).iter().any(|d| {
            let compact: String = d.chars().filter(|c| !c.is_whitespace()).collect();
            compact.eq_ignore_ascii_case(DISPLAY_NONE)
        })
    }

    /// Attached and not hidden by itself or an ancestor.
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.is_attached(id) && !self.ancestors(id).any(|a| self.is_hidden(a))
    }

    fn style_decls(&self, id: NodeId) -> Vec<String> {
        self.attr(id, "style")
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn is_display(decl: &str) -> bool {
    decl.split(':')
        .next()
        .is_some_and(|prop| prop.trim().eq_ignore_ascii_case("display"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_div(style: &str) -> (DocumentTree, NodeId) {
        let html = format!(r#"<main><div style="{style}"><p>x</p></div></main>"#);
        let tree = DocumentTree::parse(&html, "main").unwrap();
        let div = tree.element_children(tree.page_root().unwrap()).next().unwrap();
        (tree, div)
    }

    #[test]
    fn test_hide_reveal_roundtrip_keeps_other_declarations() {
        let (mut tree, div) = tree_with_div("color: red");
        tree.hide(div);
        assert!(tree.is_hidden(div));
        assert_eq!(tree.attr(div, "style"), Some("color: red;display:none"));

        tree.reveal(div);
        assert!(!tree.is_hidden(div));
        assert_eq!(tree.attr(div, "style"), Some("color: red"));
    }

    #[test]
    fn test_reveal_drops_empty_style() {
        let mut tree = DocumentTree::parse("<main><div></div></main>", "main").unwrap();
        let div = tree.element_children(tree.page_root().unwrap()).next().unwrap();
        tree.hide(div);
        tree.reveal(div);
        assert!(!tree.has_attr(div, "style"));
    }

    #[test]
    fn test_visibility_inherits_from_ancestors() {
        let (mut tree, div) = tree_with_div("");
        let p = tree.element_children(div).next().unwrap();
        assert!(tree.is_visible(p));
        tree.hide(div);
        assert!(!tree.is_visible(p));
        tree.detach(div);
        tree.reveal(div);
        assert!(!tree.is_visible(p));
    }
}
