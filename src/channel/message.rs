//! Channel Message Protocol
//!
//! JSON frames exchanged with authoring clients over WebSocket.
//!
//! # Inbound
//!
//! An edit notification, either bare or wrapped the way the editor emits
//! its DOM events:
//!
//! ```json
//! {"type": "aue:content-update", "detail": {"request": {...}, "response": {...}}}
//! ```
//!
//! # Outbound
//!
//! - `applied`: a record was swapped in
//! - `failed`: a record could not be swapped
//! - `rejected`: the notification or record was unusable
//! - `deferred`: queued behind an overlapping swap
//! - `reload`: the page fell back to a full reload
//! - `connected`: handshake greeting

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actor::messages::Outcome;
use crate::debug;
use crate::patch::{EditNotification, PatchError, ScopeKind};

/// Outbound message sent over WebSocket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelMessage {
    Applied {
        resource: String,
        scope: ScopeKind,
    },
    Failed {
        resource: String,
        code: String,
        error: String,
    },
    Rejected {
        reason: String,
    },
    Deferred {
        resource: String,
    },
    Reload {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Connected {
        /// Server version for compatibility check
        version: String,
    },
}

impl ChannelMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}

impl From<Outcome> for ChannelMessage {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Applied { resource, scope } => Self::Applied { resource, scope },
            Outcome::Failed {
                resource,
                code,
                error,
            } => Self::Failed {
                resource,
                code: code.to_string(),
                error,
            },
            Outcome::Rejected { reason } => Self::Rejected { reason },
            Outcome::Deferred { resource } => Self::Deferred { resource },
            Outcome::Reloaded { reason } => Self::Reload {
                reason: Some(reason),
            },
        }
    }
}

/// Parse one inbound text frame into a notification.
pub fn parse_inbound(text: &str) -> Result<EditNotification, PatchError> {
    let mut value: Value = serde_json::from_str(text).map_err(|e| {
        debug!("ws"; "not json: {}", e);
        PatchError::MalformedNotification
    })?;

    let detail = value
        .get_mut("detail")
        .filter(|d| d.is_object())
        .map(Value::take);
    if let Some(Value::Object(mut detail)) = detail {
        if !detail.contains_key("type")
            && let Some(kind) = value.get("type").cloned()
        {
            detail.insert("type".to_string(), kind);
        }
        value = Value::Object(detail);
    }

    serde_json::from_value(value).map_err(|e| {
        debug!("ws"; "not a notification: {}", e);
        PatchError::MalformedNotification
    })
}
