//! # Emission payload.
//!
//! Each handler receives its own clone of the [`Emission`]: which event, on
//! which component, why it ended (for `End`), plus a [`Controller`] handle so
//! that a handler can drive navigation itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::channel::LifecycleEvent;
use crate::components::{ComponentId, EndReason};
use crate::core::{ComponentHandle, Controller};

/// Global sequence counter for emission ordering.
static EMISSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Payload of one emission.
#[derive(Clone)]
pub struct Emission {
    seq: u64,
    event: LifecycleEvent,
    component: ComponentId,
    label: Arc<str>,
    reason: Option<EndReason>,
    controller: Controller,
}

impl Emission {
    pub(crate) fn new(
        controller: Controller,
        component: ComponentId,
        label: Arc<str>,
        event: LifecycleEvent,
        reason: Option<EndReason>,
    ) -> Self {
        Self {
            seq: EMISSION_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            event,
            component,
            label,
            reason,
            controller,
        }
    }

    /// Monotonic sequence number across all emissions in the process.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The event being emitted.
    pub fn event(&self) -> LifecycleEvent {
        self.event
    }

    /// The emitting component.
    pub fn component(&self) -> ComponentId {
        self.component
    }

    /// Label of the emitting component.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn label_arc(&self) -> Arc<str> {
        Arc::clone(&self.label)
    }

    /// End reason; set for `End` emissions only.
    pub fn reason(&self) -> Option<&EndReason> {
        self.reason.as_ref()
    }

    /// Controller of the emitting tree.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Lifecycle handle of the emitting component.
    pub fn handle(&self) -> ComponentHandle {
        self.controller.component(self.component)
    }
}

impl std::fmt::Debug for Emission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emission")
            .field("seq", &self.seq)
            .field("event", &self.event)
            .field("component", &self.component)
            .field("label", &self.label)
            .field("reason", &self.reason)
            .finish()
    }
}
