//! Subtree Swapper
//!
//! Replaces the live node of a resolved scope with its counterpart from the
//! sanitized replacement, without a moment where the resource is missing or
//! shown twice:
//!
//! ```text
//! 1. hide(new)            old visible, new parked
//! 2. insert new after old old visible, new attached but hidden
//! 3. decorate(new)        old visible
//! 4. remove(old)          nothing visible for this resource (same tick)
//! 5. reveal(new)          new visible
//! ```
//!
//! Steps 1-3 run for every new node before step 4 runs at all. If any
//! decoration fails, the inserted nodes are detached again and the attributes
//! decoration touched above them are restored, leaving the tree exactly as it
//! was.
//!
//! Fragments are paired by position: the i-th new fragment goes right after
//! the i-th live match. Surplus new fragments follow the last paired one;
//! surplus live matches are only removed.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::config::MarkupConfig;
use crate::decorate::Decoratable;
use crate::dom::{DocumentTree, Element, NodeId};

use super::{PatchError, ResolvedScope, ResourceLocator, ScopeKind};

// =============================================================================
// Types
// =============================================================================

/// One entry of the swap journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStep {
    Hide(NodeId),
    Insert(NodeId),
    Decorate(NodeId),
    Remove(NodeId),
    Reveal(NodeId),
}

/// Old and new nodes of one swap, ready to run.
#[derive(Debug, Clone)]
pub struct PendingSwap {
    pub kind: ScopeKind,
    pub resource: String,
    /// Live nodes to replace, in document order.
    pub old: Vec<NodeId>,
    /// Detached replacement nodes, in replacement order.
    pub new: Vec<NodeId>,
}

/// What a successful swap did.
#[derive(Debug, Clone)]
pub struct SwapReport {
    pub kind: ScopeKind,
    pub resource: String,
    pub old: Vec<NodeId>,
    pub new: Vec<NodeId>,
    pub steps: Vec<SwapStep>,
}

// =============================================================================
// Swapper
// =============================================================================

pub struct SubtreeSwapper {
    decorator: Arc<dyn Decoratable>,
    markup: MarkupConfig,
}

impl SubtreeSwapper {
    pub fn new(decorator: impl Decoratable + 'static, markup: MarkupConfig) -> Self {
        Self {
            decorator: Arc::new(decorator),
            markup,
        }
    }

    /// Prepare and run in one go.
    pub fn apply(
        &self,
        tree: &mut DocumentTree,
        scope: &ResolvedScope,
    ) -> Result<SwapReport, PatchError> {
        let pending = self.prepare(tree, scope)?;
        self.swap(tree, pending)
    }

    /// Import the replacement and pick the old and new nodes.
    pub fn prepare(
        &self,
        tree: &mut DocumentTree,
        scope: &ResolvedScope,
    ) -> Result<PendingSwap, PatchError> {
        let resource = scope.boundary_resource.clone();
        let replacement = scope
            .replacement
            .as_ref()
            .filter(|m| !m.is_empty())
            .ok_or_else(|| PatchError::ReplacementNotFound(resource.clone()))?;

        let imported = tree.import(replacement)?;
        let candidates: Vec<NodeId> = imported
            .iter()
            .flat_map(|top| tree.subtree(*top))
            .filter(|n| tree.is_element(*n))
            .collect();

        let (old, new) = match scope.kind {
            ScopeKind::Fragment => {
                let old = ResourceLocator::new(tree, &self.markup).locate_all(&resource);
                (old, self.fragments(tree, &candidates, &resource))
            }
            kind => {
                let carries_id = |n: &NodeId| {
                    tree.attr(*n, &self.markup.resource_attr) == Some(resource.as_str())
                };
                let found = candidates.iter().copied().find(carries_id).or_else(|| {
                    (kind == ScopeKind::WholePage).then(|| {
                        candidates
                            .iter()
                            .copied()
                            .find(|n| tree.tag(*n) == Some(self.markup.page_root.as_str()))
                    })?
                });
                let old = if tree.is_attached(scope.live_node) {
                    vec![scope.live_node]
                } else {
                    Vec::new()
                };
                (old, found.into_iter().collect())
            }
        };

        if old.is_empty() {
            return Err(PatchError::ResourceNotFound(resource));
        }
        if new.is_empty() {
            return Err(PatchError::ReplacementNotFound(resource));
        }
        Ok(PendingSwap {
            kind: scope.kind,
            resource,
            old,
            new,
        })
    }

    /// Outermost replacement elements instrumented with `resource`.
    fn fragments(&self, tree: &DocumentTree, candidates: &[NodeId], resource: &str) -> Vec<NodeId> {
        let matches = |n: NodeId| {
            tree.attr(n, &self.markup.resource_attr) == Some(resource)
                || tree.attr(n, &self.markup.richtext_resource_attr) == Some(resource)
        };
        let all: Vec<NodeId> = candidates.iter().copied().filter(|n| matches(*n)).collect();
        all.iter()
            .copied()
            .filter(|n| {
                !tree
                    .ancestors(*n)
                    .skip(1)
                    .any(|a| all.contains(&a))
            })
            .collect()
    }

    /// Run the five steps.
    pub fn swap(
        &self,
        tree: &mut DocumentTree,
        pending: PendingSwap,
    ) -> Result<SwapReport, PatchError> {
        let PendingSwap {
            kind,
            resource,
            old,
            new,
        } = pending;

        if old.is_empty() {
            return Err(PatchError::ResourceNotFound(resource));
        }
        let saved = snapshot_ancestors(tree, &old);

        let mut steps = Vec::with_capacity(new.len() * 4 + old.len());
        let mut inserted: Vec<NodeId> = Vec::with_capacity(new.len());

        for (i, &node) in new.iter().enumerate() {
            let Some(anchor) = old.get(i).or(inserted.last()).copied() else {
                break;
            };
            tree.hide(node);
            steps.push(SwapStep::Hide(node));

            if let Err(e) = tree.insert_after(anchor, node) {
                rollback(tree, &inserted, saved);
                return Err(e.into());
            }
            inserted.push(node);
            steps.push(SwapStep::Insert(node));

            if let Err(source) = self.decorator.decorate(tree, node) {
                rollback(tree, &inserted, saved);
                return Err(PatchError::DecorationThrew { resource, source });
            }
            steps.push(SwapStep::Decorate(node));
        }

        for &node in &old {
            tree.detach(node);
            steps.push(SwapStep::Remove(node));
        }
        for &node in &new {
            tree.reveal(node);
            steps.push(SwapStep::Reveal(node));
        }

        Ok(SwapReport {
            kind,
            resource,
            old,
            new,
            steps,
        })
    }
}

/// Copies of the elements above every old node; decoration may retag them.
fn snapshot_ancestors(tree: &DocumentTree, old: &[NodeId]) -> Vec<(NodeId, Element)> {
    let mut seen = FxHashSet::default();
    old.iter()
        .flat_map(|node| tree.ancestors(*node).skip(1))
        .filter(|a| seen.insert(*a))
        .filter_map(|a| tree.element(a).cloned().map(|el| (a, el)))
        .collect()
}

fn rollback(tree: &mut DocumentTree, inserted: &[NodeId], saved: Vec<(NodeId, Element)>) {
    for node in inserted {
        tree.detach(*node);
    }
    for (id, element) in saved {
        tree.restore_element(id, element);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorate::{DecorateError, Pipeline};
    use crate::patch::SanitizerGate;
    use parking_lot::Mutex;

    const PAGE: &str = r#"<main><div data-aue-resource="urn:s1"><div><div class="hero" data-aue-resource="urn:w1"><h1>Old</h1></div></div><p data-aue-resource="urn:f">old</p></div></main>"#;

    fn page() -> (DocumentTree, MarkupConfig) {
        let markup = MarkupConfig::default();
        let mut tree = DocumentTree::parse(PAGE, &markup.page_root).unwrap();
        Pipeline::new(&markup).decorate_page(&mut tree).unwrap();
        (tree, markup)
    }

    fn scope_for(tree: &DocumentTree, markup: &MarkupConfig, id: &str, html: &str) -> ResolvedScope {
        let node = ResourceLocator::new(tree, markup).locate(id).unwrap();
        ResolvedScope::resolve(tree, markup, node, id)
            .with_replacement(SanitizerGate::default().sanitize(html))
    }

    fn pipeline_swapper(markup: &MarkupConfig) -> SubtreeSwapper {
        SubtreeSwapper::new(Pipeline::new(markup), markup.clone())
    }

    #[test]
    fn test_widget_swap_journal() {
        let (mut tree, markup) = page();
        let scope = scope_for(
            &tree,
            &markup,
            "urn:w1",
            r#"<div class="hero" data-aue-resource="urn:w1"><h1>New</h1></div>"#,
        );
        assert_eq!(scope.kind, ScopeKind::Widget);
        let old = scope.live_node;

        let report = pipeline_swapper(&markup).apply(&mut tree, &scope).unwrap();
        let new = report.new[0];
        assert_eq!(
            report.steps,
            vec![
                SwapStep::Hide(new),
                SwapStep::Insert(new),
                SwapStep::Decorate(new),
                SwapStep::Remove(old),
                SwapStep::Reveal(new),
            ]
        );
        assert!(!tree.is_attached(old));
        assert!(tree.is_visible(new));
        assert!(tree.has_class(new, "block"), "new widget decorated");
        assert_eq!(tree.text_content(new), "New");
        assert!(!tree.to_html().contains("display:none"));
    }

    #[test]
    fn test_no_flicker_during_decoration() {
        let (mut tree, markup) = page();
        let scope = scope_for(
            &tree,
            &markup,
            "urn:w1",
            r#"<div class="hero" data-aue-resource="urn:w1"><h1>New</h1></div>"#,
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let swapper = SubtreeSwapper::new(
            move |tree: &mut DocumentTree, root: NodeId| -> Result<(), DecorateError> {
                let visible = tree
                    .find_all_by_attr(tree.document(), "data-aue-resource", "urn:w1")
                    .into_iter()
                    .filter(|n| tree.is_visible(*n))
                    .count();
                recorder.lock().push((visible, tree.is_visible(root)));
                Ok(())
            },
            markup.clone(),
        );

        let report = swapper.apply(&mut tree, &scope).unwrap();
        assert_eq!(*seen.lock(), vec![(1, false)]);

        let visible: Vec<_> = tree
            .find_all_by_attr(tree.document(), "data-aue-resource", "urn:w1")
            .into_iter()
            .filter(|n| tree.is_visible(*n))
            .collect();
        assert_eq!(visible, report.new);
    }

    #[test]
    fn test_failed_decoration_leaves_tree_untouched() {
        let (mut tree, markup) = page();
        let before = tree.to_html();
        let scope = scope_for(
            &tree,
            &markup,
            "urn:w1",
            r#"<div class="cards" data-aue-resource="urn:w1"><p>x</p></div>"#,
        );
        // Retags the wrapper and section first, then fails.
        let failing = Pipeline::new(&markup).with_step(
            |_: &mut DocumentTree, _: NodeId| -> Result<(), DecorateError> {
                Err(DecorateError::Step {
                    step: "widget",
                    message: "init failed".into(),
                })
            },
        );
        let swapper = SubtreeSwapper::new(failing, markup.clone());

        let err = swapper.apply(&mut tree, &scope).unwrap_err();
        assert!(matches!(err, PatchError::DecorationThrew { ref resource, .. } if resource == "urn:w1"));
        assert_eq!(tree.to_html(), before);
        assert!(tree.is_visible(scope.live_node));
    }

    #[test]
    fn test_missing_replacement_node() {
        let (mut tree, markup) = page();
        let before = tree.to_html();
        let scope = scope_for(&tree, &markup, "urn:w1", r#"<div data-aue-resource="urn:other"></div>"#);
        let err = pipeline_swapper(&markup).apply(&mut tree, &scope).unwrap_err();
        assert!(matches!(err, PatchError::ReplacementNotFound(id) if id == "urn:w1"));
        assert_eq!(tree.to_html(), before);
    }

    #[test]
    fn test_fragment_swap_inserts_all_in_order() {
        let markup = MarkupConfig::default();
        let mut tree = DocumentTree::parse(
            r#"<main><article><p data-aue-resource="urn:f">old</p><hr></article></main>"#,
            &markup.page_root,
        )
        .unwrap();
        let scope = scope_for(
            &tree,
            &markup,
            "urn:f",
            r#"<p data-aue-resource="urn:f">1</p><p data-aue-resource="urn:f">2</p><p data-aue-resource="urn:f">3</p>"#,
        );
        assert_eq!(scope.kind, ScopeKind::Fragment);

        let report = pipeline_swapper(&markup).apply(&mut tree, &scope).unwrap();
        assert_eq!(report.new.len(), 3);
        assert_eq!(
            tree.to_html(),
            r#"<main><article><p data-aue-resource="urn:f">1</p><p data-aue-resource="urn:f">2</p><p data-aue-resource="urn:f">3</p><hr></article></main>"#
        );
        let removes = report
            .steps
            .iter()
            .position(|s| matches!(s, SwapStep::Remove(_)))
            .unwrap();
        let decorates = report
            .steps
            .iter()
            .filter(|s| matches!(s, SwapStep::Decorate(_)))
            .count();
        assert_eq!(decorates, 3);
        assert!(report.steps[..removes]
            .iter()
            .all(|s| !matches!(s, SwapStep::Reveal(_))));
    }

    const SPLIT: &str = r#"<main><article id="a"><p data-aue-resource="urn:f">old1</p></article><aside id="b"><p data-aue-resource="urn:f">old2</p></aside></main>"#;

    #[test]
    fn test_fragments_in_separate_regions_swap_in_place() {
        let markup = MarkupConfig::default();
        let mut tree = DocumentTree::parse(SPLIT, &markup.page_root).unwrap();
        let scope = scope_for(
            &tree,
            &markup,
            "urn:f",
            r#"<p data-aue-resource="urn:f">new1</p><p data-aue-resource="urn:f">new2</p>"#,
        );
        assert_eq!(scope.kind, ScopeKind::Fragment);

        let report = pipeline_swapper(&markup).apply(&mut tree, &scope).unwrap();
        assert_eq!(report.old.len(), 2);
        assert_eq!(
            tree.to_html(),
            r#"<main><article id="a"><p data-aue-resource="urn:f">new1</p></article><aside id="b"><p data-aue-resource="urn:f">new2</p></aside></main>"#
        );
    }

    #[test]
    fn test_fragment_count_mismatch() {
        let markup = MarkupConfig::default();

        let mut tree = DocumentTree::parse(SPLIT, &markup.page_root).unwrap();
        let scope = scope_for(&tree, &markup, "urn:f", r#"<p data-aue-resource="urn:f">only</p>"#);
        pipeline_swapper(&markup).apply(&mut tree, &scope).unwrap();
        assert_eq!(
            tree.to_html(),
            r#"<main><article id="a"><p data-aue-resource="urn:f">only</p></article><aside id="b"></aside></main>"#
        );

        let mut tree = DocumentTree::parse(SPLIT, &markup.page_root).unwrap();
        let scope = scope_for(
            &tree,
            &markup,
            "urn:f",
            r#"<p data-aue-resource="urn:f">1</p><p data-aue-resource="urn:f">2</p><p data-aue-resource="urn:f">3</p>"#,
        );
        pipeline_swapper(&markup).apply(&mut tree, &scope).unwrap();
        assert_eq!(
            tree.to_html(),
            r#"<main><article id="a"><p data-aue-resource="urn:f">1</p></article><aside id="b"><p data-aue-resource="urn:f">2</p><p data-aue-resource="urn:f">3</p></aside></main>"#
        );
    }

    #[test]
    fn test_failed_fragment_decoration_restores_every_region() {
        let markup = MarkupConfig::default();
        let mut tree = DocumentTree::parse(SPLIT, &markup.page_root).unwrap();
        let before = tree.to_html();
        let scope = scope_for(
            &tree,
            &markup,
            "urn:f",
            r#"<p data-aue-resource="urn:f">new1</p><p data-aue-resource="urn:f">new2</p>"#,
        );
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        // Retags the parent region, and fails on the second fragment.
        let swapper = SubtreeSwapper::new(
            move |tree: &mut DocumentTree, root: NodeId| -> Result<(), DecorateError> {
                if let Some(parent) = tree.parent(root) {
                    tree.add_class(parent, "touched");
                }
                let mut calls = counter.lock();
                *calls += 1;
                if *calls == 2 {
                    return Err(DecorateError::Step {
                        step: "fragment",
                        message: "boom".into(),
                    });
                }
                Ok(())
            },
            markup.clone(),
        );

        assert!(swapper.apply(&mut tree, &scope).is_err());
        assert_eq!(tree.to_html(), before);
    }

    #[test]
    fn test_whole_page_swap_keeps_binding() {
        let (mut tree, markup) = page();
        let old_root = tree.page_root().unwrap();
        let scope = ResolvedScope::resolve(&tree, &markup, old_root, "urn:page").with_replacement(
            SanitizerGate::default().sanitize(r#"<main><div><p>fresh</p></div></main>"#),
        );
        assert_eq!(scope.kind, ScopeKind::WholePage);

        let report = pipeline_swapper(&markup).apply(&mut tree, &scope).unwrap();
        let new_root = report.new[0];
        assert_eq!(tree.page_root(), Some(old_root), "rebinding is the caller's job");
        assert!(tree.is_attached(new_root));
        assert!(!tree.is_attached(old_root));
        let section = tree.element_children(new_root).next().unwrap();
        assert!(tree.has_class(section, "section"));
    }
}
