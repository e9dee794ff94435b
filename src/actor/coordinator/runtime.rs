use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::messages::{Outcome, WsMsg};
use crate::actor::reconciler::{ReconcilerActor, ReconcilerHandle};
use crate::actor::ws::WsActor;
use crate::logger::{status_error, status_success, status_warning};

/// Run all actors concurrently.
pub(super) async fn run_actors(
    reconciler: ReconcilerActor,
    ws: WsActor,
    handle: ReconcilerHandle,
    outcomes: mpsc::UnboundedReceiver<Outcome>,
    ws_tx: mpsc::Sender<WsMsg>,
    shutdown_rx: Option<Receiver<()>>,
) -> Result<()> {
    let reconciler_handle = tokio::spawn(reconciler.run());
    let ws_handle = tokio::spawn(ws.run());
    let forward_handle = tokio::spawn(forward_outcomes(outcomes, ws_tx.clone()));

    if let Some(rx) = shutdown_rx {
        loop {
            if rx.try_recv().is_ok() {
                crate::debug!("actor"; "shutdown signal received");
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    } else {
        tokio::select! {
            _ = reconciler_handle => {}
            _ = ws_handle => {}
        }
        return Ok(());
    }

    crate::debug!("actor"; "sending shutdown");
    handle.shutdown();
    let _ = ws_tx.send(WsMsg::Shutdown).await;

    let timeout = Duration::from_millis(500);
    let _ = tokio::time::timeout(timeout, reconciler_handle).await;
    let _ = tokio::time::timeout(timeout, ws_handle).await;
    forward_handle.abort();

    Ok(())
}

/// Show each outcome on the status line and broadcast it to clients.
async fn forward_outcomes(mut outcomes: mpsc::UnboundedReceiver<Outcome>, ws_tx: mpsc::Sender<WsMsg>) {
    while let Some(outcome) = outcomes.recv().await {
        match &outcome {
            Outcome::Applied { resource, scope } => status_success(&format!("{resource} ({scope})")),
            Outcome::Failed {
                resource,
                code,
                error,
            } => status_error(&format!("{resource} ({code})"), error),
            Outcome::Reloaded { reason } => status_warning(&format!("reload: {reason}")),
            Outcome::Rejected { .. } | Outcome::Deferred { .. } => {}
        }
        if ws_tx.send(WsMsg::Outcome(outcome)).await.is_err() {
            break;
        }
    }
}
