//! Patch failure taxonomy.
//!
//! Failures are local to one update record. A notification falls back to a
//! full reload only when none of its records could be applied.

use thiserror::Error;

use crate::decorate::DecorateError;
use crate::dom::DomError;

#[derive(Debug, Error)]
pub enum PatchError {
    /// No resolvable resource id, or no update records. Dropped silently.
    #[error("notification carries no resource id or no updates")]
    MalformedNotification,

    #[error("resource `{0}` is not present in the live document")]
    ResourceNotFound(String),

    #[error("replacement markup has no node for resource `{0}`")]
    ReplacementNotFound(String),

    #[error("decoration failed for resource `{resource}`")]
    DecorationThrew {
        resource: String,
        #[source]
        source: DecorateError,
    },

    #[error("markup for resource `{resource}` unavailable: {reason}")]
    SourceUnavailable { resource: String, reason: String },

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl PatchError {
    /// Short machine-readable code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedNotification => "malformed-notification",
            Self::ResourceNotFound(_) => "resource-not-found",
            Self::ReplacementNotFound(_) => "replacement-not-found",
            Self::DecorationThrew { .. } => "decoration-threw",
            Self::SourceUnavailable { .. } => "source-unavailable",
            Self::Dom(_) => "dom",
        }
    }
}
