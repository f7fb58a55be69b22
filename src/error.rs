//! Error types used by the studyflow engine.
//!
//! This module defines three error types:
//!
//! - [`StateError`]: a lifecycle operation was invoked out of order relative
//!   to the component state machine (programming error in the authored tree).
//! - [`HandlerError`]: one or more subscribed handlers failed during an emission.
//! - [`LifecycleError`]: returned by every lifecycle method; wraps either of the above.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging.
//! Sequencer exhaustion is **not** an error; containers treat it as "end this container".

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::channel::LifecycleEvent;
use crate::components::{ComponentId, Status};

/// # Errors produced by state machine violations.
///
/// These are never retried: they unwind to whichever external caller invoked
/// the offending lifecycle method.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// `prepare()`/`run()` called on a component that is already running.
    #[error("component {component} is already running")]
    AlreadyRunning {
        /// The offending component.
        component: ComponentId,
    },

    /// `prepare()`/`run()` called on a component that ended without an intervening rerun.
    #[error("component {component} has already ended; rerun it first")]
    AlreadyEnded {
        /// The offending component.
        component: ComponentId,
    },

    /// The component is locked against further mutation until it is reset.
    #[error("component {component} is locked")]
    Locked {
        /// The offending component.
        component: ComponentId,
    },

    /// A presentation hook was invoked on a leaf that is not running.
    #[error("component {component} is not running (status: {status})")]
    NotRunning {
        /// The offending component.
        component: ComponentId,
        /// Its status at the time of the call.
        status: Status,
    },

    /// The id does not belong to this controller's tree.
    #[error("unknown component {component}")]
    UnknownComponent {
        /// The id that could not be resolved.
        component: ComponentId,
    },

    /// Another branch outside the component's subtree is still running.
    #[error("component {component} cannot start while {active} is running")]
    ConflictingBranch {
        /// The component that was asked to start.
        component: ComponentId,
        /// A running component outside its ancestor chain and subtree.
        active: ComponentId,
    },

    /// Materializing a child would exceed the configured maximum depth.
    #[error("tree depth {depth} exceeds the configured maximum of {max}")]
    DepthExceeded {
        /// Depth the child would have had (root = 0).
        depth: usize,
        /// Configured maximum number of levels.
        max: usize,
    },
}

impl StateError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use studyflow::{ComponentId, StateError};
    ///
    /// let err = StateError::Locked { component: ComponentId::from_index(3) };
    /// assert_eq!(err.as_label(), "state_locked");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StateError::AlreadyRunning { .. } => "state_already_running",
            StateError::AlreadyEnded { .. } => "state_already_ended",
            StateError::Locked { .. } => "state_locked",
            StateError::NotRunning { .. } => "state_not_running",
            StateError::UnknownComponent { .. } => "state_unknown_component",
            StateError::ConflictingBranch { .. } => "state_conflicting_branch",
            StateError::DepthExceeded { .. } => "state_depth_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// A single failed handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Component whose handler failed.
    pub component: ComponentId,
    /// Component label at emission time.
    pub label: Arc<str>,
    /// Event being emitted.
    pub event: LifecycleEvent,
    /// Error (or panic) message.
    pub message: String,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} handler on {} ({}) failed: {}",
            self.event, self.label, self.component, self.message
        )
    }
}

/// # Aggregated handler failures.
///
/// Every handler of an emission is attempted; failures are collected in
/// emission order. A lifecycle call that triggers several emissions merges
/// their failures into one value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", summarize(.failures))]
pub struct HandlerError {
    failures: Vec<HandlerFailure>,
}

fn summarize(failures: &[HandlerFailure]) -> String {
    match failures {
        [] => "handler failed".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

impl HandlerError {
    /// Builds an error from collected failures; `Ok` when nothing failed.
    pub(crate) fn check(failures: Vec<HandlerFailure>) -> Result<(), HandlerError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(HandlerError { failures })
        }
    }

    /// All failures, in the order they occurred.
    pub fn failures(&self) -> &[HandlerFailure] {
        &self.failures
    }

    /// Number of failed handler invocations.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Always `false` for a constructed error; provided for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Appends the failures of `other`.
    pub fn merge(&mut self, other: HandlerError) {
        self.failures.extend(other.failures);
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        "handler_failed"
    }

    /// Returns a human-readable message listing every failure.
    pub fn as_message(&self) -> String {
        self.failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// # Errors returned by lifecycle methods.
///
/// A `Handler` error does not undo the transition that triggered the
/// emission; a `State` error means the transition did not happen.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// State machine violation.
    #[error(transparent)]
    State(#[from] StateError),

    /// One or more handlers failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl LifecycleError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleError::State(e) => e.as_label(),
            LifecycleError::Handler(e) => e.as_label(),
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LifecycleError::State(e) => e.as_message(),
            LifecycleError::Handler(e) => e.as_message(),
        }
    }

    /// The state error, if this is one.
    pub fn as_state(&self) -> Option<&StateError> {
        match self {
            LifecycleError::State(e) => Some(e),
            LifecycleError::Handler(_) => None,
        }
    }

    /// The handler error, if this is one.
    pub fn as_handler(&self) -> Option<&HandlerError> {
        match self {
            LifecycleError::Handler(e) => Some(e),
            LifecycleError::State(_) => None,
        }
    }
}

/// Collects handler failures across the steps of one lifecycle call.
///
/// State errors short-circuit through `absorb`; handler errors are kept and
/// returned by `finish` once the call has done all of its work.
#[derive(Debug, Default)]
pub(crate) struct Deferred {
    handler: Option<HandlerError>,
}

impl Deferred {
    pub(crate) fn absorb(&mut self, res: Result<(), LifecycleError>) -> Result<(), StateError> {
        match res {
            Ok(()) => Ok(()),
            Err(LifecycleError::State(e)) => Err(e),
            Err(LifecycleError::Handler(e)) => {
                self.hold(e);
                Ok(())
            }
        }
    }

    pub(crate) fn absorb_handler(&mut self, res: Result<(), HandlerError>) {
        if let Err(e) = res {
            self.hold(e);
        }
    }

    fn hold(&mut self, e: HandlerError) {
        match &mut self.handler {
            Some(held) => held.merge(e),
            None => self.handler = Some(e),
        }
    }

    pub(crate) fn finish(self) -> Result<(), LifecycleError> {
        match self.handler {
            Some(e) => Err(LifecycleError::Handler(e)),
            None => Ok(()),
        }
    }
}
