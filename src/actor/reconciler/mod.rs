//! Reconciler Actor - The Notification Dispatcher
//!
//! Owns the live `DocumentTree` and turns each inbound edit notification
//! into subtree swaps:
//!
//! ```text
//! Notify --> target id --> records --> locate --> scope --> [fetch] --> sanitize --> swap
//!              |             |           |                    |                      |
//!           Rejected     Rejected     Failed             Fetched msg           Applied/Failed
//! ```
//!
//! All records rejected or failed means the notification falls back to a
//! full reload, exactly once.
//!
//! # Serialization
//!
//! Fetching markup is the only suspending step; it runs in a spawned task
//! that posts `Fetched` back. While a dispatch is in flight its boundaries
//! are claimed (see `inflight`). Later notifications that overlap a claimed
//! boundary, or arrive while a whole-page swap is pending, are deferred and
//! re-dispatched once the claim is released.
//!
//! # Modules
//!
//! - `inflight` - claimed boundaries, whole-page gate, deferred queue
//! - `source` - `MarkupSource` seam (payload by default)
//! - `fallback` - `PageReload` seam (re-read the page file by default)

mod fallback;
mod inflight;
mod source;
#[cfg(test)]
mod tests;

pub use fallback::{FileReload, PageReload};
pub use source::{MarkupSource, PayloadMarkup};

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot};

use inflight::InFlight;

use super::messages::{Outcome, ReconcileMsg, Ticket};
use crate::channel::PageSnapshot;
use crate::config::MarkupConfig;
use crate::decorate::{Decoratable, Pipeline};
use crate::dom::{DocumentTree, NodeId};
use crate::patch::{
    EditNotification, PatchError, ResolvedScope, ResourceLocator, SanitizerGate, ScopeKind,
    SubtreeSwapper, UpdateRecord,
};
use crate::{debug, log};

// =============================================================================
// Handle
// =============================================================================

/// Sending side of the reconciler. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct ReconcilerHandle {
    tx: mpsc::UnboundedSender<ReconcileMsg>,
}

impl ReconcilerHandle {
    /// Fire and forget: the notification is queued, never awaited.
    pub fn notify(&self, notification: EditNotification) {
        if self.tx.send(ReconcileMsg::Notify(notification)).is_err() {
            debug!("patch"; "reconciler stopped, notification dropped");
        }
    }

    /// Serialized live document.
    pub async fn snapshot(&self) -> Option<String> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(ReconcileMsg::Snapshot(tx)).ok()?;
        rx.await.ok()
    }

    /// Resolves once nothing is in flight or deferred.
    pub async fn settled(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(ReconcileMsg::Settled(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(ReconcileMsg::Shutdown);
    }
}

/// Receiving side, consumed by [`ReconcilerActor::new`].
pub struct ReconcilerInbox {
    rx: mpsc::UnboundedReceiver<ReconcileMsg>,
    weak_tx: mpsc::WeakUnboundedSender<ReconcileMsg>,
}

/// Create the reconciler's channel.
pub fn channel() -> (ReconcilerHandle, ReconcilerInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    let weak_tx = tx.downgrade();
    (ReconcilerHandle { tx }, ReconcilerInbox { rx, weak_tx })
}

// =============================================================================
// Dispatch Records
// =============================================================================

/// A record that passed locating and scope resolution.
#[derive(Debug)]
struct Planned {
    record: UpdateRecord,
    /// Id the record was located by.
    resource: String,
    kind: ScopeKind,
    boundary: NodeId,
    boundary_resource: String,
    /// Live nodes the swap will replace: every match for a fragment, the
    /// boundary otherwise.
    claims: Vec<NodeId>,
}

/// A notification whose markup is being fetched.
#[derive(Debug)]
struct Dispatch {
    target: String,
    planned: Vec<Planned>,
    /// Records already rejected or failed before the fetch.
    failed: usize,
}

// =============================================================================
// Actor
// =============================================================================

pub struct ReconcilerActor<S: MarkupSource = PayloadMarkup> {
    rx: mpsc::UnboundedReceiver<ReconcileMsg>,
    weak_tx: mpsc::WeakUnboundedSender<ReconcileMsg>,
    outcomes: mpsc::UnboundedSender<Outcome>,
    tree: DocumentTree,
    markup: MarkupConfig,
    gate: SanitizerGate,
    swapper: SubtreeSwapper,
    source: Arc<S>,
    reload: Box<dyn PageReload>,
    state: InFlight,
    jobs: FxHashMap<Ticket, Dispatch>,
    settled_waiters: Vec<oneshot::Sender<()>>,
    snapshot: Option<Arc<ArcSwap<PageSnapshot>>>,
    reloads: u64,
}

impl ReconcilerActor<PayloadMarkup> {
    /// Create an actor with the default sanitizer, decoration pipeline and
    /// payload markup source.
    pub fn new(
        inbox: ReconcilerInbox,
        outcomes: mpsc::UnboundedSender<Outcome>,
        tree: DocumentTree,
        markup: MarkupConfig,
        reload: impl PageReload + 'static,
    ) -> Self {
        let swapper = SubtreeSwapper::new(Pipeline::new(&markup), markup.clone());
        Self {
            rx: inbox.rx,
            weak_tx: inbox.weak_tx,
            outcomes,
            tree,
            markup,
            gate: SanitizerGate::default(),
            swapper,
            source: Arc::new(PayloadMarkup),
            reload: Box::new(reload),
            state: InFlight::default(),
            jobs: FxHashMap::default(),
            settled_waiters: Vec::new(),
            snapshot: None,
            reloads: 0,
        }
    }
}

impl<S: MarkupSource> ReconcilerActor<S> {
    pub fn with_sanitizer(mut self, gate: SanitizerGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_decorator(mut self, decorator: impl Decoratable + 'static) -> Self {
        self.swapper = SubtreeSwapper::new(decorator, self.markup.clone());
        self
    }

    /// Publish the serialized document here after every change.
    pub fn with_snapshot(mut self, cell: Arc<ArcSwap<PageSnapshot>>) -> Self {
        self.snapshot = Some(cell);
        self
    }

    pub fn with_source<T: MarkupSource>(self, source: T) -> ReconcilerActor<T> {
        ReconcilerActor {
            rx: self.rx,
            weak_tx: self.weak_tx,
            outcomes: self.outcomes,
            tree: self.tree,
            markup: self.markup,
            gate: self.gate,
            swapper: self.swapper,
            source: Arc::new(source),
            reload: self.reload,
            state: self.state,
            jobs: self.jobs,
            settled_waiters: self.settled_waiters,
            snapshot: self.snapshot,
            reloads: self.reloads,
        }
    }

    /// Run the actor event loop.
    pub async fn run(mut self) {
        self.publish();

        while let Some(msg) = self.rx.recv().await {
            match msg {
                ReconcileMsg::Notify(notification) => self.on_notify(notification),
                ReconcileMsg::Fetched { ticket, results } => self.on_fetched(ticket, results),
                ReconcileMsg::Snapshot(reply) => {
                    let _ = reply.send(self.tree.to_html());
                }
                ReconcileMsg::Settled(reply) => self.settled_waiters.push(reply),
                ReconcileMsg::Shutdown => {
                    debug!("patch"; "shutting down");
                    break;
                }
            }

            if self.state.is_idle() {
                for waiter in self.settled_waiters.drain(..) {
                    let _ = waiter.send(());
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Notify
    // -------------------------------------------------------------------------

    fn on_notify(&mut self, notification: EditNotification) {
        let Some(target) = notification.target_resource_id().map(str::to_string) else {
            self.reject(format!("{:?} notification names no resource", notification.kind));
            return;
        };
        if notification.updates.is_empty() {
            self.reject(format!("no updates for `{target}`"));
            return;
        }
        if self.state.whole_page_in_flight() {
            self.defer(notification, target);
            return;
        }

        let mut early = Vec::new();
        let mut planned = Vec::new();
        for record in &notification.updates {
            let id = notification
                .record_resource_id(record)
                .unwrap_or(target.as_str())
                .to_string();
            if record.markup.trim().is_empty() {
                early.push(Outcome::Rejected {
                    reason: format!("empty markup for `{id}`"),
                });
                continue;
            }
            match ResourceLocator::new(&self.tree, &self.markup).locate(&id) {
                Ok(node) => {
                    let scope = ResolvedScope::resolve(&self.tree, &self.markup, node, &id);
                    let claims = if scope.kind == ScopeKind::Fragment {
                        ResourceLocator::new(&self.tree, &self.markup)
                            .locate_all(&scope.boundary_resource)
                    } else {
                        vec![scope.live_node]
                    };
                    planned.push(Planned {
                        record: record.clone(),
                        resource: id,
                        kind: scope.kind,
                        boundary: scope.live_node,
                        boundary_resource: scope.boundary_resource,
                        claims,
                    });
                }
                Err(e) => early.push(failed_outcome(&id, &e)),
            }
        }

        let planned = self.supersede(planned);
        if planned
            .iter()
            .flat_map(|p| &p.claims)
            .any(|node| self.state.conflicts(&self.tree, *node))
        {
            self.defer(notification, target);
            return;
        }

        let failed = early.len();
        for outcome in early {
            if let Outcome::Failed {
                resource, error, ..
            } = &outcome
            {
                log!("error"; "`{}`: {}", resource, error);
            }
            self.report(outcome);
        }
        if planned.is_empty() {
            self.finish(&target, 0, failed);
            return;
        }

        let whole_page = planned.iter().any(|p| p.kind == ScopeKind::WholePage);
        let ticket = self
            .state
            .claim(planned.iter().flat_map(|p| p.claims.iter().copied()).collect(), whole_page);
        let records: Vec<UpdateRecord> = planned.iter().map(|p| p.record.clone()).collect();
        debug!("patch"; "dispatch #{} `{}` ({} records)", ticket, target, records.len());
        self.jobs.insert(
            ticket,
            Dispatch {
                target,
                planned,
                failed,
            },
        );
        self.spawn_fetch(ticket, records);
    }

    /// Drop records whose claimed nodes lie inside another record's claims:
    /// the container swap replaces them anyway. On a shared node the first
    /// record wins.
    fn supersede(&self, planned: Vec<Planned>) -> Vec<Planned> {
        let covered: Vec<bool> = planned
            .iter()
            .enumerate()
            .map(|(i, p)| {
                planned.iter().enumerate().any(|(j, q)| {
                    j != i
                        && p.claims.iter().any(|node| {
                            q.claims.iter().any(|claim| {
                                if claim == node {
                                    j < i
                                } else {
                                    self.tree.contains(*claim, *node)
                                }
                            })
                        })
                })
            })
            .collect();

        planned
            .into_iter()
            .zip(covered)
            .filter_map(|(p, covered)| {
                if covered {
                    debug!("patch"; "`{}` superseded by its container", p.resource);
                    None
                } else {
                    Some(p)
                }
            })
            .collect()
    }

    fn spawn_fetch(&self, ticket: Ticket, records: Vec<UpdateRecord>) {
        let Some(tx) = self.weak_tx.upgrade() else {
            return;
        };
        let source = Arc::clone(&self.source);
        tokio::spawn(async move {
            let mut results = Vec::with_capacity(records.len());
            for record in &records {
                results.push(source.fetch(record).await);
            }
            let _ = tx.send(ReconcileMsg::Fetched { ticket, results });
        });
    }

    fn defer(&mut self, notification: EditNotification, target: String) {
        debug!("patch"; "deferring `{}` until the in-flight swap completes", target);
        self.state.defer(notification);
        self.report(Outcome::Deferred { resource: target });
    }

    fn reject(&mut self, reason: String) {
        debug!("patch"; "rejected: {}", reason);
        self.report(Outcome::Rejected { reason });
    }

    // -------------------------------------------------------------------------
    // Fetched
    // -------------------------------------------------------------------------

    fn on_fetched(&mut self, ticket: Ticket, results: Vec<anyhow::Result<String>>) {
        let Some(job) = self.jobs.remove(&ticket) else {
            debug!("patch"; "dropping result of discarded dispatch #{}", ticket);
            return;
        };

        let mut applied = 0;
        let mut failed = job.failed;
        for (plan, result) in job.planned.into_iter().zip(results) {
            if self.apply(plan, result) {
                applied += 1;
            } else {
                failed += 1;
            }
        }
        self.state.release(ticket);

        if applied > 0 {
            self.publish();
        }
        self.finish(&job.target, applied, failed);
        self.drain_deferred();
    }

    fn apply(&mut self, plan: Planned, result: anyhow::Result<String>) -> bool {
        let markup = match result {
            Ok(markup) => markup,
            Err(e) => {
                let error = PatchError::SourceUnavailable {
                    resource: plan.resource.clone(),
                    reason: format!("{e:#}"),
                };
                self.fail(&plan.resource, &error);
                return false;
            }
        };

        // Deleted under us by another swap: the caller falls back to a reload.
        if !self.tree.is_attached(plan.boundary) {
            self.fail(
                &plan.resource,
                &PatchError::ResourceNotFound(plan.boundary_resource),
            );
            return false;
        }

        let scope = ResolvedScope {
            kind: plan.kind,
            live_node: plan.boundary,
            boundary_resource: plan.boundary_resource,
            replacement: None,
        }
        .with_replacement(self.gate.sanitize(&markup));

        match self.swapper.apply(&mut self.tree, &scope) {
            Ok(report) => {
                if plan.kind == ScopeKind::WholePage
                    && let Some(&root) = report.new.first()
                {
                    self.tree.set_page_root(root);
                }
                debug!("patch"; "applied `{}` ({}, {} node(s))", plan.resource, plan.kind, report.new.len());
                self.report(Outcome::Applied {
                    resource: plan.resource,
                    scope: plan.kind,
                });
                true
            }
            Err(e) => {
                self.fail(&plan.resource, &e);
                false
            }
        }
    }

    fn fail(&mut self, resource: &str, error: &PatchError) {
        log!("error"; "`{}`: {}", resource, error);
        self.report(failed_outcome(resource, error));
    }

    /// Reload when nothing of the notification could be applied.
    fn finish(&mut self, target: &str, applied: usize, failed: usize) {
        if applied == 0 && failed > 0 {
            self.fallback(format!("no update applied for `{target}`"));
        }
    }

    fn fallback(&mut self, reason: String) {
        match self.reload.reload(&reason) {
            Ok(tree) => self.tree = tree,
            Err(e) => log!("error"; "reload failed: {:#}", e),
        }
        self.reloads += 1;
        self.state.clear();
        self.jobs.clear();
        self.publish();
        self.report(Outcome::Reloaded { reason });
    }

    fn drain_deferred(&mut self) {
        let reloads = self.reloads;
        for notification in self.state.take_deferred() {
            if self.reloads != reloads {
                break;
            }
            self.on_notify(notification);
        }
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    fn report(&self, outcome: Outcome) {
        let _ = self.outcomes.send(outcome);
    }

    fn publish(&self) {
        if let Some(cell) = &self.snapshot {
            cell.store(Arc::new(PageSnapshot::new(self.tree.to_html())));
        }
    }
}

fn failed_outcome(resource: &str, error: &PatchError) -> Outcome {
    Outcome::Failed {
        resource: resource.to_string(),
        code: error.code(),
        error: error.to_string(),
    }
}
