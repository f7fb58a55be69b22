//! # Bookkeeping events published by the controller.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Transition events**: one per lifecycle step of a node (prepared, running,
//!   rendered, shown, ended, locked, reset)
//! - **Navigation events**: current-leaf changes, jump requests, handler failures
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! Transition events are published for skipped nodes too (with `skipped = true`),
//! which makes them the place to observe skip chains: skipped nodes never reach
//! their `Run`/`Render`/`Show` handlers.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use studyflow::{ComponentId, Event, EventKind};
//!
//! let ev = Event::new(EventKind::ComponentEnded)
//!     .with_component(ComponentId::from_index(2))
//!     .with_label("fixation")
//!     .with_reason("skipped")
//!     .with_skipped(true);
//!
//! assert_eq!(ev.kind, EventKind::ComponentEnded);
//! assert_eq!(ev.label.as_deref(), Some("fixation"));
//! assert!(ev.skipped);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::components::ComponentId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of controller events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Transition events ===
    /// Node prepared.
    ///
    /// Sets: `component`, `label`, `skipped`.
    ComponentPrepared,

    /// Node entered `Running`.
    ///
    /// Sets: `component`, `label`, `skipped`, `iteration` (loops).
    ComponentRunning,

    /// Leaf rendered.
    ///
    /// Sets: `component`, `label`.
    ComponentRendered,

    /// Leaf shown.
    ///
    /// Sets: `component`, `label`.
    ComponentShown,

    /// Node ended.
    ///
    /// Sets: `component`, `label`, `reason` (end reason label), `skipped`.
    ComponentEnded,

    /// Node locked.
    ///
    /// Sets: `component`, `label`, `skipped`.
    ComponentLocked,

    /// Node subtree reset to `Initialized` (rerun or next loop pass).
    ///
    /// Sets: `component`, `label`.
    ComponentReset,

    // === Navigation events ===
    /// A leaf became the current leaf.
    ///
    /// Sets: `component`, `label`.
    LeafChanged,

    /// `jump` was invoked.
    ///
    /// Sets: `component` (sender), `label`, `reason` (`rerun`, `next`, `abort`).
    JumpRequested,

    /// One or more handlers of an emission failed.
    ///
    /// Sets: `component`, `label`, `reason` (aggregated failure message).
    HandlerFailed,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `label` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `label` (subscriber name), `reason` (`full` or `closed`).
    SubscriberOverflow,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::ComponentPrepared => "component_prepared",
            EventKind::ComponentRunning => "component_running",
            EventKind::ComponentRendered => "component_rendered",
            EventKind::ComponentShown => "component_shown",
            EventKind::ComponentEnded => "component_ended",
            EventKind::ComponentLocked => "component_locked",
            EventKind::ComponentReset => "component_reset",
            EventKind::LeafChanged => "leaf_changed",
            EventKind::JumpRequested => "jump_requested",
            EventKind::HandlerFailed => "handler_failed",
            EventKind::SubscriberPanicked => "subscriber_panicked",
            EventKind::SubscriberOverflow => "subscriber_overflow",
        }
    }
}

/// Controller event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Node the event is about, if any.
    pub component: Option<ComponentId>,
    /// Node label (or subscriber name for subscriber events).
    pub label: Option<Arc<str>>,
    /// Human-readable reason (end reason, jump mode, failure details).
    pub reason: Option<Arc<str>>,
    /// `true` if the node is marked `skip`.
    pub skipped: bool,
    /// Loop pass (0-based), for loop nodes.
    pub iteration: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            component: None,
            label: None,
            reason: None,
            skipped: false,
            iteration: None,
        }
    }

    /// Attaches the node id.
    #[inline]
    pub fn with_component(mut self, id: ComponentId) -> Self {
        self.component = Some(id);
        self
    }

    /// Attaches a label.
    #[inline]
    pub fn with_label(mut self, label: impl Into<Arc<str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Marks the event as concerning a skipped node.
    #[inline]
    pub fn with_skipped(mut self, skipped: bool) -> Self {
        self.skipped = skipped;
        self
    }

    /// Attaches a loop pass.
    #[inline]
    pub fn with_iteration(mut self, iteration: u32) -> Self {
        self.iteration = Some(iteration);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_label(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_label(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// `true` for events about a node of the tree.
    #[inline]
    pub fn is_component_event(&self) -> bool {
        self.component.is_some()
    }
}
