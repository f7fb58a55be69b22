//! # Lifecycle status, end reasons and timestamps.
//!
//! ```text
//! Initialized ──prepare()──► Prepared ──run()──► Running ──end()──► Done
//!      ▲                                                              │
//!      └──────────────────────── rerun / reset ◄──────────────────────┘
//! ```
//!
//! Status only increases within one generation; a rerun starts a new one.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle status of a component.
///
/// Ordered: `Initialized < Prepared < Running < Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Status {
    /// Created (or reset), not yet prepared.
    #[default]
    Initialized,
    /// Prepared for the current generation.
    Prepared,
    /// Running; for a leaf this means on screen.
    Running,
    /// Ended.
    Done,
}

impl Status {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Status::Initialized => "initialized",
            Status::Prepared => "prepared",
            Status::Running => "running",
            Status::Done => "done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Why a component ended.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndReason {
    /// Ended normally; containers use this when their sequencer is exhausted.
    Completed,
    /// Passed through because the component is marked `skip`.
    Skipped,
    /// Superseded by an ancestor ending or by a rerun.
    Abort,
    /// A leaf-level timer fired.
    Timeout,
    /// The participant responded.
    Response,
    /// Skipped ahead by `Jump::Next`.
    Jump,
    /// Task-specific reason.
    Custom(Arc<str>),
}

impl EndReason {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &str {
        match self {
            EndReason::Completed => "completed",
            EndReason::Skipped => "skipped",
            EndReason::Abort => "abort",
            EndReason::Timeout => "timeout",
            EndReason::Response => "response",
            EndReason::Jump => "jump",
            EndReason::Custom(reason) => reason,
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl From<&str> for EndReason {
    /// Parses driver-supplied reasons; `"end"` is an alias of `completed`.
    fn from(reason: &str) -> Self {
        match reason {
            "end" | "completed" => EndReason::Completed,
            "skipped" => EndReason::Skipped,
            "abort" => EndReason::Abort,
            "timeout" => EndReason::Timeout,
            "response" => EndReason::Response,
            "jump" => EndReason::Jump,
            other => EndReason::Custom(Arc::from(other)),
        }
    }
}

impl From<String> for EndReason {
    fn from(reason: String) -> Self {
        EndReason::from(reason.as_str())
    }
}

/// Wall-clock marks of each lifecycle step in the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamps {
    pub prepare: Option<Instant>,
    pub run: Option<Instant>,
    pub render: Option<Instant>,
    pub show: Option<Instant>,
    pub end: Option<Instant>,
    pub lock: Option<Instant>,
}

impl Timestamps {
    /// Time between `run` and `end`, once both happened.
    pub fn duration(&self) -> Option<Duration> {
        Some(self.end?.saturating_duration_since(self.run?))
    }
}
