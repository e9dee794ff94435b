//! Authoring Channel
//!
//! Everything that crosses the process boundary in `serve` mode:
//!
//! - `message` - inbound notification frames and outbound outcome frames
//! - `server` - WebSocket listener handing clients to the `WsActor`
//! - `snapshot` - the served document with its ETag

pub mod message;
pub mod server;
mod snapshot;

pub use message::{ChannelMessage, parse_inbound};
pub use snapshot::PageSnapshot;
