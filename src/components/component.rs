//! # Component descriptions.
//!
//! A [`Component`] is a description: options, a [`ComponentKind`] and the
//! handlers registered before the tree is handed to a controller. Descriptions
//! are materialized lazily: the root when the [`Controller`](crate::Controller)
//! is built, every other node when its parent's sequencer first produces it.
//! From then on the node is addressed by its [`ComponentId`].
//!
//! ## Example
//! ```rust
//! use studyflow::{Component, ComponentOptions, HandlerFn, LifecycleEvent};
//!
//! let fixation = Component::leaf(ComponentOptions::new().id("fixation"));
//! let probe = Component::leaf(ComponentOptions::new().id("probe"))
//!     .on(LifecycleEvent::Show, HandlerFn::arc(|_e| async { anyhow::Ok(()) }));
//!
//! let trial = Component::sequence(ComponentOptions::new().id("trial"), vec![fixation, probe]);
//! assert!(trial.is_container());
//! ```

use std::fmt;

use crate::channel::{HandlerRef, LifecycleEvent, Subscription, SubscriptionId};
use crate::components::ComponentOptions;
use crate::sequencer::ChildSource;

/// Stable arena id of a materialized component within one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(usize);

impl ComponentId {
    /// Builds an id from a raw arena index.
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Raw arena index (materialization order).
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How many passes a loop makes over its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetitions {
    /// Fixed number of passes (clamped to at least one).
    Times(u32),
    /// Repeat until ended from outside; a pass that activates no leaf ends the loop.
    Unbounded,
}

impl Repetitions {
    /// `true` if another pass may start after pass number `iteration` (0-based).
    pub(crate) fn allows_another(self, iteration: u32) -> bool {
        match self {
            Repetitions::Times(n) => iteration.saturating_add(1) < n.max(1),
            Repetitions::Unbounded => true,
        }
    }
}

/// Structural kind of a materialized node (the kind without its children).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Leaf,
    Sequence,
    Loop(Repetitions),
}

impl Shape {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Shape::Leaf => "leaf",
            Shape::Sequence => "sequence",
            Shape::Loop(_) => "loop",
        }
    }
}

/// What a component is, together with its (unmaterialized) children.
pub enum ComponentKind {
    /// Unit of presentation.
    Leaf,
    /// Runs its children in order, ends when they are exhausted.
    Sequence(ChildSource),
    /// Like a sequence, but rewinds and reruns its children on exhaustion.
    Loop {
        source: ChildSource,
        repetitions: Repetitions,
    },
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Leaf => f.write_str("Leaf"),
            ComponentKind::Sequence(source) => f.debug_tuple("Sequence").field(source).finish(),
            ComponentKind::Loop {
                source,
                repetitions,
            } => f
                .debug_struct("Loop")
                .field("source", source)
                .field("repetitions", repetitions)
                .finish(),
        }
    }
}

/// Description of one node of an experiment tree.
pub struct Component {
    pub(crate) options: ComponentOptions,
    pub(crate) kind: ComponentKind,
    pub(crate) subscriptions: Vec<Subscription>,
}

impl Component {
    /// Creates a leaf.
    pub fn leaf(options: ComponentOptions) -> Self {
        Self::new(options, ComponentKind::Leaf)
    }

    /// Creates a sequence over `children` (a `Vec<Component>` or any [`ChildSource`]).
    pub fn sequence(options: ComponentOptions, children: impl Into<ChildSource>) -> Self {
        Self::new(options, ComponentKind::Sequence(children.into()))
    }

    /// Creates a loop that passes over `children` according to `repetitions`.
    pub fn looped(
        options: ComponentOptions,
        repetitions: Repetitions,
        children: impl Into<ChildSource>,
    ) -> Self {
        Self::new(
            options,
            ComponentKind::Loop {
                source: children.into(),
                repetitions,
            },
        )
    }

    /// Creates a component of an explicit kind.
    pub fn new(options: ComponentOptions, kind: ComponentKind) -> Self {
        Self {
            options,
            kind,
            subscriptions: Vec::new(),
        }
    }

    /// Registers a handler invoked on every emission of `event`.
    pub fn on(mut self, event: LifecycleEvent, handler: HandlerRef) -> Self {
        self.subscriptions
            .push(Subscription::new(SubscriptionId::next(), event, handler, false));
        self
    }

    /// Registers a handler invoked on the first emission of `event` only.
    pub fn once(mut self, event: LifecycleEvent, handler: HandlerRef) -> Self {
        self.subscriptions
            .push(Subscription::new(SubscriptionId::next(), event, handler, true));
        self
    }

    /// Returns the options.
    pub fn options(&self) -> &ComponentOptions {
        &self.options
    }

    /// Returns mutable options (before materialization only).
    pub fn options_mut(&mut self) -> &mut ComponentOptions {
        &mut self.options
    }

    /// Returns the kind.
    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    /// `true` for sequences and loops.
    pub fn is_container(&self) -> bool {
        !matches!(self.kind, ComponentKind::Leaf)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("options", &self.options)
            .field("kind", &self.kind)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
