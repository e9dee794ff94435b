//! Resource Locator
//!
//! Maps a resource id to the live element instrumented with it.

use crate::config::MarkupConfig;
use crate::dom::{DocumentTree, NodeId};
use crate::log;

use super::PatchError;

/// Read-only view over the live tree that answers "where is resource X".
pub struct ResourceLocator<'a> {
    tree: &'a DocumentTree,
    markup: &'a MarkupConfig,
}

impl<'a> ResourceLocator<'a> {
    pub fn new(tree: &'a DocumentTree, markup: &'a MarkupConfig) -> Self {
        Self { tree, markup }
    }

    /// First attached element carrying `id`, in document order.
    ///
    /// Duplicates are a data-quality problem of the page, not a failure:
    /// the first match wins and a warning is logged.
    pub fn locate(&self, id: &str) -> Result<NodeId, PatchError> {
        let matches = self.locate_all(id);
        match matches.as_slice() {
            [] => Err(PatchError::ResourceNotFound(id.to_string())),
            [only] => Ok(*only),
            [first, ..] => {
                log!("patch"; "resource `{}` appears {} times, using the first", id, matches.len());
                Ok(*first)
            }
        }
    }

    /// Every attached element carrying `id`, in document order.
    ///
    /// Falls back to rich-text instrumentation when no element carries the
    /// resource attribute itself.
    pub fn locate_all(&self, id: &str) -> Vec<NodeId> {
        if id.is_empty() {
            return Vec::new();
        }
        let document = self.tree.document();
        let found = self
            .tree
            .find_all_by_attr(document, &self.markup.resource_attr, id);
        if !found.is_empty() {
            return found;
        }
        self.tree
            .find_all_by_attr(document, &self.markup.richtext_resource_attr, id)
    }
}
