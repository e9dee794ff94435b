//! Sections: the direct `div` children of the page root.

use crate::config::MarkupConfig;
use crate::dom::{DocumentTree, NodeId};

use super::{DecorateError, Decoratable};

pub struct SectionStep {
    page_root: String,
    section_class: String,
}

impl SectionStep {
    pub fn new(markup: &MarkupConfig) -> Self {
        Self {
            page_root: markup.page_root.clone(),
            section_class: markup.section_class.clone(),
        }
    }

    /// The bound page root, or a replacement for it that is not bound yet.
    fn is_page_root(&self, tree: &DocumentTree, node: NodeId) -> bool {
        tree.page_root() == Some(node) || tree.tag(node) == Some(self.page_root.as_str())
    }

    fn mark(&self, tree: &mut DocumentTree, section: NodeId) {
        tree.add_class(section, &self.section_class);
        tree.set_attr(section, "data-section-status", "loaded");
    }
}

impl Decoratable for SectionStep {
    fn decorate(&self, tree: &mut DocumentTree, root: NodeId) -> Result<(), DecorateError> {
        if self.is_page_root(tree, root) {
            let sections: Vec<NodeId> = tree
                .element_children(root)
                .filter(|c| tree.tag(*c) == Some("div"))
                .collect();
            for section in sections {
                self.mark(tree, section);
            }
            return Ok(());
        }

        let under_root = tree
            .parent(root)
            .is_some_and(|p| self.is_page_root(tree, p));
        if under_root && tree.tag(root) == Some("div") {
            self.mark(tree, root);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_root_children_become_sections() {
        let markup = MarkupConfig::default();
        let mut tree =
            DocumentTree::parse("<main><div>a</div><p>x</p><div>b</div></main>", "main").unwrap();
        let root = tree.page_root().unwrap();
        SectionStep::new(&markup).decorate(&mut tree, root).unwrap();
        assert_eq!(
            tree.outer_html(root),
            r#"<main><div class="section" data-section-status="loaded">a</div><p>x</p><div class="section" data-section-status="loaded">b</div></main>"#
        );
    }

    #[test]
    fn test_inserted_section_is_marked() {
        let markup = MarkupConfig::default();
        let mut tree = DocumentTree::parse("<main><div>a</div></main>", "main").unwrap();
        let root = tree.page_root().unwrap();
        let fresh = tree.create_element("div");
        tree.append_child(root, fresh).unwrap();
        SectionStep::new(&markup).decorate(&mut tree, fresh).unwrap();
        assert!(tree.has_class(fresh, "section"));
        let old = tree.element_children(root).next().unwrap();
        assert!(!tree.has_class(old, "section"), "only the decorated root");
    }

    #[test]
    fn test_nested_div_is_not_a_section() {
        let markup = MarkupConfig::default();
        let mut tree = DocumentTree::parse("<main><div><div>x</div></div></main>", "main").unwrap();
        let outer = tree.element_children(tree.page_root().unwrap()).next().unwrap();
        let inner = tree.element_children(outer).next().unwrap();
        SectionStep::new(&markup).decorate(&mut tree, inner).unwrap();
        assert!(!tree.has_attr(inner, "class"));
    }
}
