//! Icons: `<span class="icon icon-NAME">` gets an `<img>` pointing at the SVG.

use crate::config::MarkupConfig;
use crate::dom::{DocumentTree, NodeId};

use super::{DecorateError, Decoratable};

pub struct IconStep {
    prefix: String,
}

impl IconStep {
    pub fn new(markup: &MarkupConfig) -> Self {
        Self {
            prefix: markup.icon_prefix.trim_end_matches('/').to_string(),
        }
    }

    fn icon_name(tree: &DocumentTree, node: NodeId) -> Option<String> {
        if tree.tag(node) != Some("span") || !tree.has_class(node, "icon") {
            return None;
        }
        tree.element(node)?
            .classes()
            .find_map(|c| c.strip_prefix("icon-"))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

impl Decoratable for IconStep {
    fn decorate(&self, tree: &mut DocumentTree, root: NodeId) -> Result<(), DecorateError> {
        let icons: Vec<_> = tree
            .subtree(root)
            .into_iter()
            .filter(|n| !tree.element_children(*n).any(|c| tree.tag(c) == Some("img")))
            .filter_map(|n| Self::icon_name(tree, n).map(|name| (n, name)))
            .collect();

        for (span, name) in icons {
            let img = tree.create_element("img");
            tree.set_attr(img, "data-icon-name", name.as_str());
            tree.set_attr(img, "src", format!("{}/{name}.svg", self.prefix));
            tree.set_attr(img, "alt", "");
            tree.set_attr(img, "loading", "lazy");
            tree.append_child(span, img)?;
        }
        Ok(())
    }
}
