//! Actor Message Definitions
//!
//! Message types for inter-actor communication.
//!
//! ```text
//! WsActor --Notify--> ReconcilerActor --Outcome--> WsActor
//!                        |    ^
//!                        +----+ Fetched (markup source task)
//! ```

use std::net::TcpStream;

use tokio::sync::oneshot;

use crate::patch::{EditNotification, ScopeKind};

/// Identifies one dispatched notification while its markup is fetched.
pub type Ticket = u64;

// =============================================================================
// ReconcilerActor Messages
// =============================================================================

/// Messages to Reconciler Actor
#[derive(Debug)]
pub enum ReconcileMsg {
    /// Inbound authoring event
    Notify(EditNotification),
    /// Markup for a dispatched notification is ready (one result per record)
    Fetched {
        ticket: Ticket,
        results: Vec<anyhow::Result<String>>,
    },
    /// Serialize the live document
    Snapshot(oneshot::Sender<String>),
    /// Reply once nothing is in flight
    Settled(oneshot::Sender<()>),
    /// Shutdown
    Shutdown,
}

// =============================================================================
// Outcomes
// =============================================================================

/// What happened to a notification or one of its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied {
        resource: String,
        scope: ScopeKind,
    },
    Failed {
        resource: String,
        code: &'static str,
        error: String,
    },
    Rejected {
        reason: String,
    },
    Deferred {
        resource: String,
    },
    Reloaded {
        reason: String,
    },
}

// =============================================================================
// WsActor Messages
// =============================================================================

/// Messages to WebSocket Actor
#[derive(Debug)]
pub enum WsMsg {
    /// Broadcast a reconciler outcome to authoring clients
    Outcome(Outcome),
    /// Add client
    AddClient(TcpStream),
    /// Shutdown
    Shutdown,
}
