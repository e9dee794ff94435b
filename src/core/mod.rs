//! Process-wide state shared by the HTTP loop, the actors and Ctrl+C.

mod state;

pub use state::{is_shutdown, register_server, setup_shutdown_handler};
