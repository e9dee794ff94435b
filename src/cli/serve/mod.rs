//! `serve`: serve a page and patch it live.
//!
//! ```text
//! browser  --GET-->  tiny_http  --load-->  ArcSwap<PageSnapshot>
//!                                                ^
//! editor   --ws-->   WsActor --> ReconcilerActor +
//! ```
//!
//! The HTTP loop only ever reads the last published snapshot; the actor
//! system runs on its own thread and publishes after every change.

mod lifecycle;
mod response;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use crossbeam::channel;
use tiny_http::{Request, Server};

use crate::actor::reconciler::FileReload;
use crate::channel::PageSnapshot;
use crate::config::cfg;
use crate::core::{is_shutdown, register_server};
use crate::log;

/// Run the `serve` command (blocking until Ctrl+C).
pub fn run(page: &Path) -> Result<()> {
    let config = cfg();
    let tree = FileReload::new(page, &config.markup).load()?;
    let snapshot = Arc::new(ArcSwap::from_pointee(PageSnapshot::new(tree.to_html())));

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    register_server(Arc::clone(&server), shutdown_tx);

    log!("serve"; "http://{} ({})", addr, page.display());

    let actors = lifecycle::spawn_actors(
        Arc::clone(&config),
        page.to_path_buf(),
        tree,
        Arc::clone(&snapshot),
        shutdown_rx,
    );
    run_request_loop(&server, &snapshot, page);
    lifecycle::wait_for_shutdown(actors);
    Ok(())
}

fn run_request_loop(server: &Server, snapshot: &ArcSwap<PageSnapshot>, page: &Path) {
    let file_name = page
        .file_name()
        .map(|name| format!("/{}", name.to_string_lossy()));

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, snapshot, file_name.as_deref()) {
            log!("serve"; "request error: {e}");
        }
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, snapshot: &ArcSwap<PageSnapshot>, file_name: Option<&str>) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }
    if !response::is_read_request(&request) {
        return response::respond_method_not_allowed(request);
    }

    let path = request.url().split(['?', '#']).next().unwrap_or_default();
    if is_page_path(path, file_name) {
        response::respond_snapshot(request, &snapshot.load())
    } else {
        response::respond_not_found(request)
    }
}

fn is_page_path(path: &str, file_name: Option<&str>) -> bool {
    matches!(path, "" | "/" | "/index.html") || file_name == Some(path)
}
