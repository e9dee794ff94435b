//! Patch Reconciler Core
//!
//! Everything needed to turn one update record into one subtree swap:
//!
//! ```text
//! UpdateRecord -> locate -> scope -> sanitize -> swap
//!   (id, html)    (node)   (grain)   (safe)    (5 steps)
//! ```
//!
//! # Modules
//!
//! - `notification` - Edit notification model and target extraction
//! - `locate` - Resource id → live node
//! - `scope` - Live node → replacement granularity
//! - `sanitize` - Sanitizer gate (the only way to get parseable markup)
//! - `swap` - Hide / insert / decorate / remove / reveal
//! - `error` - Failure taxonomy

pub mod error;
pub mod locate;
pub mod notification;
pub mod sanitize;
pub mod scope;
pub mod swap;

pub use error::PatchError;
pub use locate::ResourceLocator;
pub use notification::{EditNotification, NotificationKind, UpdateRecord};
pub use sanitize::{AllowlistSanitizer, SanitizedMarkup, Sanitizer, SanitizerGate};
pub use scope::{ResolvedScope, ScopeKind};
pub use swap::{PendingSwap, SubtreeSwapper, SwapReport, SwapStep};
