//! `apply`: replay recorded notifications against a page.
//!
//! Each line of the events file is one notification. Lines are dispatched
//! one at a time and the reconciler is allowed to settle in between, so the
//! result does not depend on fetch timing.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::actor::messages::Outcome;
use crate::actor::reconciler::{self, FileReload, ReconcilerActor};
use crate::channel::parse_inbound;
use crate::config::LivepatchConfig;
use crate::patch::{AllowlistSanitizer, SanitizerGate};
use crate::{debug, log};

/// Counts of what happened during a replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplySummary {
    pub applied: usize,
    pub failed: usize,
    pub rejected: usize,
    pub reloads: usize,
    pub malformed: usize,
}

impl ApplySummary {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Applied { .. } => self.applied += 1,
            Outcome::Failed { .. } => self.failed += 1,
            Outcome::Rejected { .. } => self.rejected += 1,
            Outcome::Reloaded { .. } => self.reloads += 1,
            Outcome::Deferred { .. } => {}
        }
    }
}

/// Run the `apply` command.
pub fn run(config: &LivepatchConfig, page: &Path, events: &Path, output: Option<&Path>) -> Result<()> {
    let (html, summary) = replay(config, page, events)?;

    log!(
        "patch";
        "{} applied, {} failed, {} rejected, {} reload(s)",
        summary.applied,
        summary.failed,
        summary.rejected + summary.malformed,
        summary.reloads
    );

    match output {
        Some(path) => {
            fs::write(path, &html).with_context(|| format!("failed to write {}", path.display()))?;
            debug!("patch"; "wrote {}", path.display());
        }
        None => println!("{html}"),
    }
    Ok(())
}

/// Load `page`, feed every notification from `events` through the
/// reconciler, and return the final document.
pub fn replay(config: &LivepatchConfig, page: &Path, events: &Path) -> Result<(String, ApplySummary)> {
    let reload = FileReload::new(page, &config.markup);
    let tree = reload.load()?;
    let events = fs::read_to_string(events)
        .with_context(|| format!("failed to read events from {}", events.display()))?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async {
        let (handle, inbox) = reconciler::channel();
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        let gate = SanitizerGate::new(AllowlistSanitizer::from_config(&config.sanitize));
        let actor = ReconcilerActor::new(inbox, outcome_tx, tree, config.markup.clone(), reload)
            .with_sanitizer(gate);
        let task = tokio::spawn(actor.run());

        let mut summary = ApplySummary::default();
        for (index, line) in events.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_inbound(line) {
                Ok(notification) => {
                    handle.notify(notification);
                    handle.settled().await;
                }
                Err(e) => {
                    log!("patch"; "line {}: {}", index + 1, e);
                    summary.malformed += 1;
                }
            }
        }

        let html = handle
            .snapshot()
            .await
            .context("reconciler stopped before the replay finished")?;
        handle.shutdown();
        let _ = task.await;

        while let Ok(outcome) = outcome_rx.try_recv() {
            summary.record(&outcome);
        }
        Ok((html, summary))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PAGE: &str = r#"<html><body><main><div><div><div class="teaser" data-aue-resource="urn:t"><p>old</p></div></div></div></main></body></html>"#;

    fn setup(events: &str) -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("page.html");
        let log = dir.path().join("events.jsonl");
        fs::write(&page, PAGE).unwrap();
        fs::write(&log, events).unwrap();
        (dir, page, log)
    }

    #[test]
    fn test_replay_applies_widget_update() {
        let events = r#"{"type":"patch","request":{"target":{"resource":"urn:t"}},"response":{"updates":[{"resource":"urn:t","content":"<div class=\"teaser\" data-aue-resource=\"urn:t\"><p>new</p></div>"}]}}"#;
        let (_dir, page, log) = setup(events);

        let (html, summary) = replay(&LivepatchConfig::default(), &page, &log).unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.reloads, 0);
        assert!(html.contains("<p>new</p>"));
        assert!(!html.contains("<p>old</p>"));
        assert!(html.contains("data-block-name=\"teaser\""), "replacement decorated");
    }

    #[test]
    fn test_replay_counts_malformed_and_missing() {
        let events = concat!(
            "not json\n",
            "\n",
            r#"{"type":"update","request":{"target":{"resource":"urn:gone"}},"response":{"updates":[{"resource":"urn:gone","content":"<p>x</p>"}]}}"#,
            "\n"
        );
        let (_dir, page, log) = setup(events);

        let (html, summary) = replay(&LivepatchConfig::default(), &page, &log).unwrap();
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.reloads, 1);
        assert!(html.contains("<p>old</p>"));
    }

    #[test]
    fn test_missing_events_file() {
        let (dir, page, _) = setup("");
        let err = replay(&LivepatchConfig::default(), &page, &dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("failed to read events"));
    }
}
