//! Per-node handler table.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::channel::{HandlerRef, LifecycleEvent};

static SUBSCRIPTION_SEQ: AtomicU64 = AtomicU64::new(1);

/// Handle of a registered handler, used to remove it with `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next() -> Self {
        Self(SUBSCRIPTION_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// One registered handler.
#[derive(Clone)]
pub(crate) struct Subscription {
    id: SubscriptionId,
    event: LifecycleEvent,
    handler: HandlerRef,
    once: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        event: LifecycleEvent,
        handler: HandlerRef,
        once: bool,
    ) -> Self {
        Self {
            id,
            event,
            handler,
            once,
        }
    }
}

/// Handlers of one node, kept in registration order.
#[derive(Default)]
pub(crate) struct HandlerTable {
    entries: Vec<Subscription>,
}

impl HandlerTable {
    pub(crate) fn insert(&mut self, sub: Subscription) -> SubscriptionId {
        let id = sub.id;
        self.entries.push(sub);
        id
    }

    /// Removes a handler; `false` if it was not registered (or already fired once).
    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|s| s.id != id);
        self.entries.len() != before
    }

    /// Handlers for `event` in registration order; `once` entries are consumed.
    pub(crate) fn snapshot(&mut self, event: LifecycleEvent) -> Vec<HandlerRef> {
        let handlers = self
            .entries
            .iter()
            .filter(|s| s.event == event)
            .map(|s| s.handler.clone())
            .collect();
        self.entries.retain(|s| !(s.once && s.event == event));
        handlers
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
