//! Actor Coordinator - Wires up the Live Patch Actor System
//!
//! The Coordinator is a thin orchestrator that:
//! - Creates communication channels
//! - Wires up actors
//! - Runs them concurrently until shutdown

mod runtime;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::messages::{Outcome, WsMsg};
use super::reconciler::{self, FileReload, ReconcilerActor};
use super::ws::WsActor;
use crate::channel::PageSnapshot;
use crate::config::LivepatchConfig;
use crate::dom::DocumentTree;
use crate::patch::{AllowlistSanitizer, SanitizerGate};
use crate::{debug, log};

const CHANNEL_BUFFER: usize = 32;

/// Coordinator - wires up and runs the actor system.
pub struct Coordinator {
    config: Arc<LivepatchConfig>,
    page: PathBuf,
    tree: DocumentTree,
    snapshot: Option<Arc<ArcSwap<PageSnapshot>>>,
    ws_port: Option<u16>,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    /// Create for an already loaded and decorated page.
    pub fn with_config(config: Arc<LivepatchConfig>, page: PathBuf, tree: DocumentTree) -> Self {
        Self {
            config,
            page,
            tree,
            snapshot: None,
            ws_port: None,
            shutdown_rx: None,
        }
    }

    /// Set WebSocket port.
    pub fn with_ws_port(mut self, port: u16) -> Self {
        self.ws_port = Some(port);
        self
    }

    /// Publish the live document here.
    pub fn with_snapshot(mut self, cell: Arc<ArcSwap<PageSnapshot>>) -> Self {
        self.snapshot = Some(cell);
        self
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run the actor system.
    pub async fn run(mut self) -> Result<()> {
        let (handle, inbox) = reconciler::channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel::<Outcome>();
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);

        if let Some(port) = self.ws_port {
            match crate::channel::server::start_ws_server(self.config.serve.interface, port, ws_tx.clone()) {
                Ok(actual) => log!("ws"; "ws://{}:{}", self.config.serve.interface, actual),
                Err(e) => log!("ws"; "websocket server failed: {}", e),
            }
        }

        let markup = self.config.markup.clone();
        let gate = SanitizerGate::new(AllowlistSanitizer::from_config(&self.config.sanitize));
        let mut reconciler = ReconcilerActor::new(
            inbox,
            outcome_tx,
            self.tree,
            markup.clone(),
            FileReload::new(&self.page, &markup),
        )
        .with_sanitizer(gate);
        if let Some(cell) = self.snapshot.take() {
            reconciler = reconciler.with_snapshot(cell);
        }

        let ws_actor = WsActor::new(ws_rx, handle.clone());

        debug!("actor"; "start");
        runtime::run_actors(reconciler, ws_actor, handle, outcome_rx, ws_tx, self.shutdown_rx.take()).await?;
        debug!("actor"; "stopped");
        Ok(())
    }
}
