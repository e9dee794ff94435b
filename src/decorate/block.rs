//! Blocks: `.section > div > div[class]`.
//!
//! The first class names the block. The block's wrapper and section are
//! tagged with the name too, so layout CSS can target them. When a block is
//! re-decorated under a new name, the old name's wrapper and container
//! classes are dropped unless another block in the section still uses it.

use crate::config::MarkupConfig;
use crate::dom::{DocumentTree, NodeId};

use super::{DecorateError, Decoratable};

pub struct BlockStep {
    block_class: String,
    section_class: String,
    resource_attr: String,
}

impl BlockStep {
    pub fn new(markup: &MarkupConfig) -> Self {
        Self {
            block_class: markup.block_class.clone(),
            section_class: markup.section_class.clone(),
            resource_attr: markup.resource_attr.clone(),
        }
    }

    /// Names of the blocks under `wrappers`, skipping `block` and any
    /// earlier rendition of it (same resource id) still awaiting removal.
    fn other_names(&self, tree: &DocumentTree, wrappers: &[NodeId], block: NodeId) -> Vec<String> {
        let resource = tree.attr(block, &self.resource_attr).filter(|r| !r.is_empty());
        wrappers
            .iter()
            .flat_map(|w| tree.element_children(*w))
            .filter(|n| *n != block)
            .filter(|n| resource.is_none() || tree.attr(*n, &self.resource_attr) != resource)
            .filter_map(|n| self.candidate(tree, n).map(|(name, ..)| name))
            .collect()
    }

    /// Drop `{old}-wrapper` / `{old}-container` left behind by a rename.
    fn drop_stale(&self, tree: &mut DocumentTree, block: NodeId, name: &str, wrapper: NodeId, section: NodeId) {
        let stale: Vec<String> = tree
            .element(wrapper)
            .map(|el| {
                el.classes()
                    .filter_map(|c| c.strip_suffix("-wrapper"))
                    .filter(|old| *old != name)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if stale.is_empty() {
            return;
        }

        let in_wrapper = self.other_names(tree, &[wrapper], block);
        let wrappers: Vec<NodeId> = tree.element_children(section).collect();
        let in_section = self.other_names(tree, &wrappers, block);
        for old in stale {
            if !in_wrapper.contains(&old) {
                tree.remove_class(wrapper, &format!("{old}-wrapper"));
            }
            if !in_section.contains(&old) {
                tree.remove_class(section, &format!("{old}-container"));
            }
        }
    }

    /// Block name of `node` if it sits where a block belongs.
    fn candidate(&self, tree: &DocumentTree, node: NodeId) -> Option<(String, NodeId, NodeId)> {
        if tree.tag(node) != Some("div") {
            return None;
        }
        let wrapper = tree.parent(node).filter(|w| tree.tag(*w) == Some("div"))?;
        let section = tree
            .parent(wrapper)
            .filter(|s| tree.has_class(*s, &self.section_class))?;
        let name = tree
            .element(node)?
            .classes()
            .find(|c| *c != self.block_class)?
            .to_string();
        Some((name, wrapper, section))
    }
}

impl Decoratable for BlockStep {
    fn decorate(&self, tree: &mut DocumentTree, root: NodeId) -> Result<(), DecorateError> {
        let blocks: Vec<_> = tree
            .subtree(root)
            .into_iter()
            .filter_map(|n| self.candidate(tree, n).map(|c| (n, c)))
            .collect();

        for (block, (name, wrapper, section)) in blocks {
            self.drop_stale(tree, block, &name, wrapper, section);
            tree.add_class(block, &self.block_class);
            tree.set_attr(block, "data-block-name", name.as_str());
            tree.set_attr(block, "data-block-status", "loaded");
            tree.add_class(wrapper, &format!("{name}-wrapper"));
            tree.add_class(section, &format!("{name}-container"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decorate(html: &str) -> String {
        let markup = MarkupConfig::default();
        let mut tree = DocumentTree::parse(html, "main").unwrap();
        let root = tree.page_root().unwrap();
        BlockStep::new(&markup).decorate(&mut tree, root).unwrap();
        tree.outer_html(root)
    }

    #[test]
    fn test_block_in_section() {
        let out = decorate(r#"<main><div class="section"><div><div class="cards wide">x</div></div></div></main>"#);
        assert_eq!(
            out,
            r#"<main><div class="section cards-container"><div class="cards-wrapper"><div class="cards wide block" data-block-name="cards" data-block-status="loaded">x</div></div></div></main>"#
        );
    }

    #[test]
    fn test_outside_section_is_ignored() {
        let html = r#"<main><div><div><div class="cards">x</div></div></div></main>"#;
        assert_eq!(decorate(html), html);
    }

    #[test]
    fn test_classless_div_is_ignored() {
        let html = r#"<main><div class="section"><div><div>x</div></div></div></main>"#;
        assert_eq!(decorate(html), html);
    }

    #[test]
    fn test_renamed_block_drops_old_classes() {
        let markup = MarkupConfig::default();
        let html = r#"<main><div class="section"><div><div class="cards" data-aue-resource="urn:b">x</div></div><div><div class="hero">h</div></div></div></main>"#;
        let mut tree = DocumentTree::parse(html, "main").unwrap();
        let root = tree.page_root().unwrap();
        let step = BlockStep::new(&markup);
        step.decorate(&mut tree, root).unwrap();

        let section = tree.element_children(root).next().unwrap();
        let wrapper = tree.element_children(section).next().unwrap();
        let old = tree.element_children(wrapper).next().unwrap();
        assert!(tree.has_class(section, "cards-container"));

        // New rendition sits next to the old one until the swap removes it.
        let new = tree.create_element("div");
        tree.set_attr(new, "class", "columns");
        tree.set_attr(new, "data-aue-resource", "urn:b");
        tree.insert_after(old, new).unwrap();
        step.decorate(&mut tree, new).unwrap();
        tree.detach(old);

        assert!(tree.has_class(section, "columns-container"));
        assert!(!tree.has_class(section, "cards-container"));
        assert!(tree.has_class(section, "hero-container"), "other blocks keep theirs");
        assert!(tree.has_class(wrapper, "columns-wrapper"));
        assert!(!tree.has_class(wrapper, "cards-wrapper"));
    }

    #[test]
    fn test_block_idempotent() {
        let html = r#"<main><div class="section"><div><div class="hero">x</div></div></div></main>"#;
        let markup = MarkupConfig::default();
        let mut tree = DocumentTree::parse(html, "main").unwrap();
        let root = tree.page_root().unwrap();
        let step = BlockStep::new(&markup);
        step.decorate(&mut tree, root).unwrap();
        let once = tree.to_html();
        step.decorate(&mut tree, root).unwrap();
        assert_eq!(tree.to_html(), once);
    }
}
