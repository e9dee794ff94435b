//! Markup sources.
//!
//! Resolving a record's markup is the only step of a swap that may suspend.
//! The reconciler runs it in a spawned task and picks the result up as a
//! `Fetched` message, so other notifications keep flowing meanwhile.

use std::future::Future;

use crate::patch::UpdateRecord;

pub trait MarkupSource: Send + Sync + 'static {
    fn fetch(&self, record: &UpdateRecord) -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// The markup shipped inside the notification itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadMarkup;

impl MarkupSource for PayloadMarkup {
    async fn fetch(&self, record: &UpdateRecord) -> anyhow::Result<String> {
        Ok(record.markup.clone())
    }
}
