//! Serialization state of the dispatcher.
//!
//! Two rules keep swaps from stepping on each other:
//! - while a whole-page swap is in flight, nothing else is dispatched;
//! - a notification whose boundary equals, contains, or sits inside an
//!   in-flight boundary waits until that swap completes.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::actor::messages::Ticket;
use crate::dom::{DocumentTree, NodeId};
use crate::patch::EditNotification;

#[derive(Debug, Default)]
pub(super) struct InFlight {
    /// Boundary nodes claimed by each dispatched notification.
    boundaries: FxHashMap<Ticket, Vec<NodeId>>,
    /// Ticket of the whole-page swap in flight, if any.
    whole_page: Option<Ticket>,
    /// Notifications waiting for an in-flight swap, in arrival order.
    deferred: VecDeque<EditNotification>,
    next_ticket: Ticket,
}

impl InFlight {
    pub fn whole_page_in_flight(&self) -> bool {
        self.whole_page.is_some()
    }

    /// Whether `node` overlaps any in-flight boundary.
    pub fn conflicts(&self, tree: &DocumentTree, node: NodeId) -> bool {
        self.boundaries
            .values()
            .flatten()
            .any(|b| tree.contains(*b, node) || tree.contains(node, *b))
    }

    /// Claim boundaries for a new dispatch.
    pub fn claim(&mut self, boundaries: Vec<NodeId>, whole_page: bool) -> Ticket {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        if whole_page {
            self.whole_page = Some(ticket);
        }
        self.boundaries.insert(ticket, boundaries);
        ticket
    }

    /// Release a completed dispatch. Returns false for unknown tickets
    /// (dispatches discarded by a reload).
    pub fn release(&mut self, ticket: Ticket) -> bool {
        if self.whole_page == Some(ticket) {
            self.whole_page = None;
        }
        self.boundaries.remove(&ticket).is_some()
    }

    pub fn defer(&mut self, notification: EditNotification) {
        self.deferred.push_back(notification);
    }

    /// Everything deferred so far, leaving the queue empty.
    pub fn take_deferred(&mut self) -> VecDeque<EditNotification> {
        std::mem::take(&mut self.deferred)
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn is_idle(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Drop all queued and in-flight state. Ticket numbers keep counting so
    /// late results of discarded dispatches stay unknown.
    pub fn clear(&mut self) {
        self.boundaries.clear();
        self.whole_page = None;
        self.deferred.clear();
    }
}
