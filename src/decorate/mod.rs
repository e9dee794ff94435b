//! Decoration Pipeline
//!
//! Turns authored markup into its interactive form. The reconciler runs the
//! pipeline on every freshly inserted node (and once on the page root at
//! load), so each step must be idempotent: decorating decorated markup is a
//! no-op.
//!
//! # Modules
//!
//! - `section` - page-root children become sections
//! - `block` - `.section > div > div[class]` become blocks
//! - `button` - lone links in paragraphs become buttons
//! - `icon` - `span.icon-<name>` gets its `<img>`
//! - `richtext` - consecutive rich-text siblings grouped into one editable

mod block;
mod button;
mod icon;
mod richtext;
mod section;

pub use block::BlockStep;
pub use button::ButtonStep;
pub use icon::IconStep;
pub use richtext::RichTextStep;
pub use section::SectionStep;

use thiserror::Error;

use crate::config::MarkupConfig;
use crate::dom::{DocumentTree, DomError, NodeId};

#[derive(Debug, Error)]
pub enum DecorateError {
    #[error("{step} step failed: {message}")]
    Step {
        step: &'static str,
        message: String,
    },

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Something that decorates the subtree rooted at `root`.
///
/// Steps may read the root's ancestors (a block needs to know it sits in a
/// section) and may touch them, but never detach or insert outside `root`.
pub trait Decoratable: Send + Sync {
    fn decorate(&self, tree: &mut DocumentTree, root: NodeId) -> Result<(), DecorateError>;
}

impl<F> Decoratable for F
where
    F: Fn(&mut DocumentTree, NodeId) -> Result<(), DecorateError> + Send + Sync,
{
    fn decorate(&self, tree: &mut DocumentTree, root: NodeId) -> Result<(), DecorateError> {
        self(tree, root)
    }
}

/// Ordered list of decoration steps.
pub struct Pipeline {
    steps: Vec<Box<dyn Decoratable>>,
}

impl Pipeline {
    /// The default steps, in order.
    pub fn new(markup: &MarkupConfig) -> Self {
        Self::empty()
            .with_step(SectionStep::new(markup))
            .with_step(BlockStep::new(markup))
            .with_step(ButtonStep)
            .with_step(IconStep::new(markup))
            .with_step(RichTextStep::new(markup))
    }

    pub fn empty() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn with_step(mut self, step: impl Decoratable + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Decorate the page root of a freshly loaded tree.
    pub fn decorate_page(&self, tree: &mut DocumentTree) -> Result<(), DecorateError> {
        match tree.page_root() {
            Some(root) => self.decorate(tree, root),
            None => Ok(()),
        }
    }
}

impl Decoratable for Pipeline {
    fn decorate(&self, tree: &mut DocumentTree, root: NodeId) -> Result<(), DecorateError> {
        for step in &self.steps {
            step.decorate(tree, root)?;
        }
        Ok(())
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Whether `child` is the only meaningful content of `parent`: the single
/// element child, with nothing but whitespace text around it.
fn is_sole_child(tree: &DocumentTree, parent: NodeId, child: NodeId) -> bool {
    tree.children(parent).iter().all(|c| {
        *c == child
            || match tree.data(*c) {
                crate::dom::NodeData::Text(text) => text.trim().is_empty(),
                crate::dom::NodeData::Comment(_) => true,
                _ => false,
            }
    }) && tree.parent(child) == Some(parent)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Decorate the page root twice and return both serializations.
    pub fn decorate_twice(html: &str) -> (String, String) {
        let markup = MarkupConfig::default();
        let pipeline = Pipeline::new(&markup);
        let mut tree = DocumentTree::parse(html, &markup.page_root).unwrap();
        pipeline.decorate_page(&mut tree).unwrap();
        let once = tree.to_html();
        pipeline.decorate_page(&mut tree).unwrap();
        (once, tree.to_html())
    }
}
