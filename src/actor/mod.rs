//! Actor System for Live Patching
//!
//! Message-passing concurrency for `serve` mode:
//!
//! ```text
//! WsActor --> ReconcilerActor --> Outcome forwarder --> WsActor
//! (frames)    (locate/swap)        (status line)       (broadcast)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `reconciler` - Notification dispatch and subtree swaps
//! - `ws` - WebSocket clients
//! - `coordinator` - Wires up and runs actors

pub mod coordinator;
pub mod messages;
pub mod reconciler;
pub mod ws;

pub use coordinator::Coordinator;
