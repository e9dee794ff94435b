//! Reconciler actor tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};

use super::*;
use crate::decorate::DecorateError;
use crate::patch::NotificationKind;

const PAGE: &str = concat!(
    r#"<main data-aue-resource="urn:page">"#,
    r#"<div class="section" data-aue-resource="urn:s1">"#,
    r#"<widget-x class="block" data-aue-resource="res-42"><p>old widget</p></widget-x>"#,
    r#"<p data-aue-resource="urn:text">old text</p>"#,
    r#"</div>"#,
    r#"<div class="section" data-aue-resource="urn:s2"><p data-aue-resource="urn:other">other</p></div>"#,
    r#"<p data-aue-resource="urn:loose">loose</p>"#,
    r#"</main>"#,
);

const WIDGET: &str =
    r#"<widget-x class="block" data-aue-resource="res-42"><p>new widget</p></widget-x>"#;

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    handle: ReconcilerHandle,
    outcomes: mpsc::UnboundedReceiver<Outcome>,
    reloads: Arc<AtomicUsize>,
    decorations: Arc<AtomicUsize>,
}

impl Harness {
    async fn settle(&mut self) -> (String, Vec<Outcome>) {
        self.handle.settled().await;
        let html = self.handle.snapshot().await.unwrap();
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.outcomes.try_recv() {
            outcomes.push(outcome);
        }
        (html, outcomes)
    }

    fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

fn page() -> DocumentTree {
    DocumentTree::parse(PAGE, "main").unwrap()
}

/// Actor with a counting decorator and a counting reload.
fn actor() -> (ReconcilerActor, Harness) {
    actor_on(PAGE)
}

fn actor_on(html: &'static str) -> (ReconcilerActor, Harness) {
    let (handle, inbox) = channel();
    let (tx, outcomes) = mpsc::unbounded_channel();
    let reloads = Arc::new(AtomicUsize::new(0));
    let decorations = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&reloads);
    let reload = move |_: &str| -> anyhow::Result<DocumentTree> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(DocumentTree::parse(html, "main")?)
    };
    let counter = Arc::clone(&decorations);
    let decorate = move |_: &mut DocumentTree, _: NodeId| -> Result<(), DecorateError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    };

    let tree = DocumentTree::parse(html, "main").unwrap();
    let actor = ReconcilerActor::new(inbox, tx, tree, MarkupConfig::default(), reload)
        .with_decorator(decorate);
    let harness = Harness {
        handle,
        outcomes,
        reloads,
        decorations,
    };
    (actor, harness)
}

fn start() -> Harness {
    let (actor, harness) = actor();
    tokio::spawn(actor.run());
    harness
}

fn update(target: &str, markup: &str) -> EditNotification {
    EditNotification::new(NotificationKind::Patch)
        .with_target(target)
        .with_update(target, markup)
}

/// Holds records whose markup carries `data-hold` until released.
struct HeldSource {
    release: Arc<Notify>,
}

impl MarkupSource for HeldSource {
    async fn fetch(&self, record: &UpdateRecord) -> anyhow::Result<String> {
        if record.markup.contains("data-hold") {
            self.release.notified().await;
        }
        Ok(record.markup.clone())
    }
}

struct FailingSource;

impl MarkupSource for FailingSource {
    async fn fetch(&self, _record: &UpdateRecord) -> anyhow::Result<String> {
        anyhow::bail!("upstream returned 503")
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_widget_update_swaps_only_the_widget() {
    let mut h = start();
    h.handle.notify(update("res-42", WIDGET));
    let (html, outcomes) = h.settle().await;

    assert_eq!(
        outcomes,
        vec![Outcome::Applied {
            resource: "res-42".into(),
            scope: ScopeKind::Widget,
        }]
    );
    assert!(html.contains("<p>new widget</p>"));
    assert!(!html.contains("old widget"));
    assert!(html.contains("old text"), "siblings untouched");
    assert!(!html.contains("display:none"));
    assert_eq!(html.matches("res-42").count(), 1);
    assert_eq!(h.decorations.load(Ordering::SeqCst), 1);
    assert_eq!(h.reloads(), 0);
}

#[tokio::test]
async fn test_text_in_section_swaps_section() {
    let mut h = start();
    h.handle.notify(update(
        "urn:text",
        r#"<div class="section" data-aue-resource="urn:s1"><p data-aue-resource="urn:text">new text</p></div>"#,
    ));
    let (html, outcomes) = h.settle().await;

    assert_eq!(
        outcomes,
        vec![Outcome::Applied {
            resource: "urn:text".into(),
            scope: ScopeKind::Section,
        }]
    );
    assert!(html.contains("new text"));
    assert!(!html.contains("old widget"), "whole section replaced");
    assert!(html.contains("urn:s2"));
}

#[tokio::test]
async fn test_fragment_inserts_every_match_in_order() {
    let mut h = start();
    h.handle.notify(update(
        "urn:loose",
        r#"<p data-aue-resource="urn:loose">a</p><p data-aue-resource="urn:loose">b</p>"#,
    ));
    let (html, outcomes) = h.settle().await;

    assert_eq!(
        outcomes,
        vec![Outcome::Applied {
            resource: "urn:loose".into(),
            scope: ScopeKind::Fragment,
        }]
    );
    assert!(html.contains(
        r#"<p data-aue-resource="urn:loose">a</p><p data-aue-resource="urn:loose">b</p>"#
    ));
    assert!(!html.contains(">loose<"));
}

#[tokio::test]
async fn test_unknown_resource_reloads_once() {
    let mut h = start();
    h.handle.notify(
        EditNotification::new(NotificationKind::Update)
            .with_target("urn:gone")
            .with_update("urn:gone", "<p>x</p>")
            .with_update("urn:also-gone", "<p>y</p>"),
    );
    let (html, outcomes) = h.settle().await;

    assert_eq!(h.reloads(), 1);
    let failures: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            Outcome::Failed { code, .. } => Some(*code),
            _ => None,
        })
        .collect();
    assert_eq!(failures, ["resource-not-found", "resource-not-found"]);
    assert!(matches!(outcomes.last(), Some(Outcome::Reloaded { .. })));
    assert_eq!(html, page().to_html());
}

#[tokio::test]
async fn test_overlapping_notification_deferred_until_swap_completes() {
    let (actor, mut h) = actor();
    let release = Arc::new(Notify::new());
    let actor = actor.with_source(HeldSource {
        release: Arc::clone(&release),
    });
    tokio::spawn(actor.run());

    h.handle.notify(update(
        "res-42",
        r#"<widget-x class="block" data-aue-resource="res-42" data-hold><p>first</p></widget-x>"#,
    ));
    h.handle.notify(update(
        "res-42",
        r#"<widget-x class="block" data-aue-resource="res-42"><p>second</p></widget-x>"#,
    ));

    assert_eq!(
        h.outcomes.recv().await,
        Some(Outcome::Deferred {
            resource: "res-42".into()
        })
    );
    release.notify_one();
    let (html, outcomes) = h.settle().await;

    assert_eq!(outcomes.len(), 2);
    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o, Outcome::Applied { scope: ScopeKind::Widget, .. }))
    );
    assert!(html.contains("second"));
    assert!(!html.contains("first"));
    assert_eq!(html.matches("res-42").count(), 1);
}

#[tokio::test]
async fn test_disjoint_notification_not_held_back() {
    let (actor, mut h) = actor();
    let release = Arc::new(Notify::new());
    tokio::spawn(
        actor
            .with_source(HeldSource {
                release: Arc::clone(&release),
            })
            .run(),
    );

    h.handle.notify(update(
        "res-42",
        r#"<widget-x class="block" data-aue-resource="res-42" data-hold><p>held</p></widget-x>"#,
    ));
    h.handle.notify(update(
        "urn:other",
        r#"<div class="section" data-aue-resource="urn:s2"><p data-aue-resource="urn:other">fresh</p></div>"#,
    ));

    assert_eq!(
        h.outcomes.recv().await,
        Some(Outcome::Applied {
            resource: "urn:other".into(),
            scope: ScopeKind::Section,
        })
    );
    release.notify_one();
    let (html, _) = h.settle().await;
    assert!(html.contains("held"));
    assert!(html.contains("fresh"));
}

#[tokio::test]
async fn test_whole_page_swap_gates_everything() {
    let (actor, mut h) = actor();
    let release = Arc::new(Notify::new());
    tokio::spawn(
        actor
            .with_source(HeldSource {
                release: Arc::clone(&release),
            })
            .run(),
    );

    h.handle.notify(update(
        "urn:page",
        r#"<main data-aue-resource="urn:page" data-hold><p data-aue-resource="urn:other">page v2</p></main>"#,
    ));
    h.handle.notify(update("urn:other", r#"<p data-aue-resource="urn:other">after</p>"#));

    assert_eq!(
        h.outcomes.recv().await,
        Some(Outcome::Deferred {
            resource: "urn:other".into()
        })
    );
    release.notify_one();
    let (html, outcomes) = h.settle().await;

    assert_eq!(
        outcomes,
        vec![
            Outcome::Applied {
                resource: "urn:page".into(),
                scope: ScopeKind::WholePage,
            },
            Outcome::Applied {
                resource: "urn:other".into(),
                scope: ScopeKind::Fragment,
            },
        ]
    );
    assert!(html.contains("after"));
    assert!(!html.contains("old widget"));
}

#[tokio::test]
async fn test_section_holding_a_pending_fragment_match_is_deferred() {
    const SPLIT: &str = concat!(
        r#"<main data-aue-resource="urn:page">"#,
        r#"<div class="section"><p data-aue-resource="urn:f">one</p></div>"#,
        r#"<div class="section" data-aue-resource="urn:s2"><p data-aue-resource="urn:f">two</p></div>"#,
        r#"</main>"#,
    );
    let (actor, mut h) = actor_on(SPLIT);
    let release = Arc::new(Notify::new());
    tokio::spawn(
        actor
            .with_source(HeldSource {
                release: Arc::clone(&release),
            })
            .run(),
    );

    h.handle.notify(update(
        "urn:f",
        r#"<p data-aue-resource="urn:f" data-hold>new1</p><p data-aue-resource="urn:f" data-hold>new2</p>"#,
    ));
    h.handle.notify(update(
        "urn:s2",
        r#"<div class="section" data-aue-resource="urn:s2"><p data-aue-resource="urn:f">fresh</p></div>"#,
    ));

    assert_eq!(
        h.outcomes.recv().await,
        Some(Outcome::Deferred {
            resource: "urn:s2".into()
        })
    );
    release.notify_one();
    let (html, outcomes) = h.settle().await;

    assert_eq!(
        outcomes,
        vec![
            Outcome::Applied {
                resource: "urn:f".into(),
                scope: ScopeKind::Fragment,
            },
            Outcome::Applied {
                resource: "urn:s2".into(),
                scope: ScopeKind::Section,
            },
        ]
    );
    assert!(html.contains("new1"));
    assert!(html.contains("fresh"), "later section swap survives");
    assert!(!html.contains("new2"));
    assert!(!html.contains(">one<"));
    assert!(!html.contains(">two<"));
}

// =============================================================================
// Dispatch Rules
// =============================================================================

#[tokio::test]
async fn test_nested_record_superseded_by_container() {
    let mut h = start();
    h.handle.notify(
        EditNotification::new(NotificationKind::Patch)
            .with_target("urn:text")
            .with_update(
                "urn:text",
                r#"<div class="section" data-aue-resource="urn:s1"><p data-aue-resource="urn:text">both</p></div>"#,
            )
            .with_update("res-42", WIDGET),
    );
    let (html, outcomes) = h.settle().await;

    assert_eq!(
        outcomes,
        vec![Outcome::Applied {
            resource: "urn:text".into(),
            scope: ScopeKind::Section,
        }]
    );
    assert!(html.contains("both"));
    assert!(!html.contains("new widget"));
}

#[tokio::test]
async fn test_notification_without_target_rejected() {
    let mut h = start();
    h.handle
        .notify(EditNotification::new(NotificationKind::Add).with_update("", "<p>x</p>"));
    h.handle
        .notify(EditNotification::new(NotificationKind::Patch).with_target("res-42"));
    let (html, outcomes) = h.settle().await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| matches!(o, Outcome::Rejected { .. })));
    assert_eq!(html, page().to_html());
    assert_eq!(h.reloads(), 0);
}

#[tokio::test]
async fn test_empty_markup_rejected_and_reloads() {
    let mut h = start();
    h.handle.notify(update("res-42", "   "));
    let (_, outcomes) = h.settle().await;

    assert!(matches!(outcomes[0], Outcome::Rejected { .. }));
    assert!(matches!(outcomes[1], Outcome::Reloaded { .. }));
    assert_eq!(h.reloads(), 1);
}

#[tokio::test]
async fn test_source_failure_reloads() {
    let (actor, mut h) = actor();
    tokio::spawn(actor.with_source(FailingSource).run());
    h.handle.notify(update("res-42", WIDGET));
    let (_, outcomes) = h.settle().await;

    assert!(matches!(
        outcomes[0],
        Outcome::Failed {
            code: "source-unavailable",
            ..
        }
    ));
    assert_eq!(h.reloads(), 1);
}

#[tokio::test]
async fn test_partial_failure_does_not_reload() {
    let mut h = start();
    h.handle.notify(
        EditNotification::new(NotificationKind::Patch)
            .with_target("res-42")
            .with_update("res-42", WIDGET)
            .with_update("urn:gone", "<p>x</p>"),
    );
    let (html, outcomes) = h.settle().await;

    assert_eq!(outcomes.len(), 2);
    assert!(html.contains("new widget"));
    assert_eq!(h.reloads(), 0);
}

#[tokio::test]
async fn test_failed_decoration_reported() {
    let (actor, mut h) = actor();
    let actor = actor.with_decorator(|_: &mut DocumentTree, _: NodeId| -> Result<(), DecorateError> {
        Err(DecorateError::Step {
            step: "widget",
            message: "boom".into(),
        })
    });
    tokio::spawn(actor.run());
    h.handle.notify(update("res-42", WIDGET));
    let (_, outcomes) = h.settle().await;

    assert!(matches!(
        outcomes[0],
        Outcome::Failed {
            code: "decoration-threw",
            ..
        }
    ));
    assert_eq!(h.reloads(), 1);
}

// =============================================================================
// Sanitizer Gate
// =============================================================================

#[tokio::test]
async fn test_script_payload_never_reaches_tree() {
    let mut h = start();
    h.handle.notify(update(
        "res-42",
        r#"<widget-x class="block" data-aue-resource="res-42"><script>alert(1)</script><p onclick="x()">safe</p></widget-x>"#,
    ));
    let (html, _) = h.settle().await;

    assert!(html.contains("safe"));
    assert!(!html.contains("script"));
    assert!(!html.contains("alert"));
    assert!(!html.contains("onclick"));
}

#[tokio::test]
async fn test_every_payload_passes_the_configured_sanitizer() {
    let (actor, mut h) = actor();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let gate = SanitizerGate::new(move |markup: &str| {
        recorder.lock().push(markup.to_string());
        markup.to_string()
    });
    tokio::spawn(actor.with_sanitizer(gate).run());

    h.handle.notify(update("res-42", WIDGET));
    h.handle.notify(update("urn:loose", r#"<p data-aue-resource="urn:loose">z</p>"#));
    h.settle().await;

    let mut seen = seen.lock().clone();
    seen.sort();
    let mut expected = vec![
        WIDGET.to_string(),
        r#"<p data-aue-resource="urn:loose">z</p>"#.to_string(),
    ];
    expected.sort();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_snapshot_cell_published() {
    let (actor, mut h) = actor();
    let cell = Arc::new(ArcSwap::from_pointee(PageSnapshot::new(String::new())));
    tokio::spawn(actor.with_snapshot(Arc::clone(&cell)).run());

    h.handle.notify(update("res-42", WIDGET));
    let (html, _) = h.settle().await;
    assert_eq!(cell.load().html, html);
}
