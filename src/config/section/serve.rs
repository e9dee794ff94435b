//! `[serve]` section configuration.
//!
//! Development server settings for `livepatch serve`.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5278                 # HTTP port serving the live page
//! ws_port = 35730             # WebSocket port accepting edit notifications
//! ```

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Development server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    pub interface: IpAddr,
    /// HTTP port number.
    pub port: u16,
    /// WebSocket port number (first of a small retry range).
    pub ws_port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5278,
            ws_port: 35730,
        }
    }
}

impl ServeConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.port == 0 {
            diag.error("serve.port", "port must be non-zero");
        }
        if self.ws_port == 0 {
            diag.error("serve.ws_port", "port must be non-zero");
        }
        if self.port == self.ws_port {
            diag.error_with_hint(
                "serve.ws_port",
                "HTTP and WebSocket ports collide",
                "pick a different ws_port",
            );
        }
    }
}
