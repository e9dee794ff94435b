//! Rich text grouping.
//!
//! Rich-text editing produces sibling elements that each carry the same
//! `(resource, prop)` instrumentation. Editors expect one editable per
//! property, so consecutive siblings sharing it are wrapped in a single
//! `div` that carries the instrumentation instead:
//!
//! ```text
//! <p data-richtext-resource=r data-richtext-prop=t>a</p>
//! <p data-richtext-resource=r data-richtext-prop=t>b</p>
//!   ->
//! <div data-aue-resource=r data-aue-prop=t data-aue-type=richtext data-aue-behavior=component>
//!   <p>a</p><p>b</p>
//! </div>
//! ```
//!
//! The decorated root itself is never grouped: that needs its siblings.

use crate::config::MarkupConfig;
use crate::dom::{DocumentTree, NodeData, NodeId};

use super::{DecorateError, Decoratable};

pub struct RichTextStep {
    resource_attr: String,
    richtext_resource_attr: String,
    richtext_prop_attr: String,
}

impl RichTextStep {
    pub fn new(markup: &MarkupConfig) -> Self {
        Self {
            resource_attr: markup.resource_attr.clone(),
            richtext_resource_attr: markup.richtext_resource_attr.clone(),
            richtext_prop_attr: markup.richtext_prop_attr.clone(),
        }
    }

    fn key(&self, tree: &DocumentTree, node: NodeId) -> Option<(String, String)> {
        let resource = tree.attr(node, &self.richtext_resource_attr)?;
        let prop = tree.attr(node, &self.richtext_prop_attr).unwrap_or_default();
        Some((resource.to_string(), prop.to_string()))
    }

    /// Runs of consecutive instrumented siblings under `parent`. Whitespace
    /// text between members belongs to the run; anything else ends it.
    fn runs(&self, tree: &DocumentTree, parent: NodeId) -> Vec<((String, String), Vec<NodeId>)> {
        let mut runs = Vec::new();
        let mut current: Option<((String, String), Vec<NodeId>)> = None;
        let mut pending_space = Vec::new();

        for &child in tree.children(parent) {
            if let NodeData::Text(text) = tree.data(child)
                && text.trim().is_empty()
            {
                pending_space.push(child);
                continue;
            }
            let key = self.key(tree, child);
            let extends = matches!((&current, &key), (Some((k, _)), Some(key)) if k == key);
            if extends {
                if let Some((_, members)) = current.as_mut() {
                    members.append(&mut pending_space);
                    members.push(child);
                }
            } else {
                runs.extend(current.take());
                current = key.map(|key| (key, vec![child]));
            }
            pending_space.clear();
        }
        runs.extend(current);
        runs
    }
}

impl Decoratable for RichTextStep {
    fn decorate(&self, tree: &mut DocumentTree, root: NodeId) -> Result<(), DecorateError> {
        let parents: Vec<NodeId> = tree
            .subtree(root)
            .into_iter()
            .filter(|n| tree.is_element(*n))
            .collect();

        for parent in parents {
            for ((resource, prop), members) in self.runs(tree, parent) {
                let wrapper = tree.create_element("div");
                tree.set_attr(wrapper, &self.resource_attr, resource);
                if !prop.is_empty() {
                    tree.set_attr(wrapper, "data-aue-prop", prop);
                }
                tree.set_attr(wrapper, "data-aue-type", "richtext");
                tree.set_attr(wrapper, "data-aue-behavior", "component");

                tree.insert_before(members[0], wrapper)?;
                for member in members {
                    tree.remove_attr(member, &self.richtext_resource_attr);
                    tree.remove_attr(member, &self.richtext_prop_attr);
                    tree.append_child(wrapper, member)?;
                }
            }
        }
        Ok(())
    }
}
