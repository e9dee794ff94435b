//! Full reload fallback.
//!
//! When no record of a notification could be applied, the live tree is
//! thrown away and rebuilt from the page source.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::MarkupConfig;
use crate::decorate::Pipeline;
use crate::dom::DocumentTree;

pub trait PageReload: Send {
    /// Produce the tree that replaces the current one.
    fn reload(&mut self, reason: &str) -> Result<DocumentTree>;
}

impl<F> PageReload for F
where
    F: FnMut(&str) -> Result<DocumentTree> + Send,
{
    fn reload(&mut self, reason: &str) -> Result<DocumentTree> {
        self(reason)
    }
}

/// Re-reads and re-decorates the page file.
pub struct FileReload {
    path: PathBuf,
    markup: MarkupConfig,
    pipeline: Pipeline,
}

impl FileReload {
    pub fn new(path: impl Into<PathBuf>, markup: &MarkupConfig) -> Self {
        Self {
            path: path.into(),
            markup: markup.clone(),
            pipeline: Pipeline::new(markup),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read, parse and decorate the page.
    pub fn load(&self) -> Result<DocumentTree> {
        let html = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let mut tree = DocumentTree::parse(&html, &self.markup.page_root)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        if tree.page_root().is_none() {
            crate::log!("warning"; "{} has no <{}> element", self.path.display(), self.markup.page_root);
        }
        self.pipeline
            .decorate_page(&mut tree)
            .with_context(|| format!("failed to decorate {}", self.path.display()))?;
        Ok(tree)
    }
}

impl PageReload for FileReload {
    fn reload(&mut self, reason: &str) -> Result<DocumentTree> {
        crate::log!("reload"; "{} ({})", self.path.display(), reason);
        self.load()
    }
}
