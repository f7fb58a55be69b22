//! Read-only view of a materialized node.

use std::sync::Arc;
use std::time::Duration;

use crate::components::{ComponentId, EndReason, Shape, Status, Timestamps};

/// Point-in-time copy of one node's bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSnapshot {
    pub id: ComponentId,
    pub label: Arc<str>,
    pub title: Option<String>,
    pub shape: Shape,
    pub status: Status,
    pub locked: bool,
    pub skip: bool,
    pub parent: Option<ComponentId>,
    /// Children materialized so far, in production order.
    pub children: Vec<ComponentId>,
    pub timestamps: Timestamps,
    pub end_reason: Option<EndReason>,
    /// Loop pass (0-based); always 0 for leaves and sequences.
    pub iteration: u32,
}

impl ComponentSnapshot {
    /// Time between run and end, once both happened.
    pub fn duration(&self) -> Option<Duration> {
        self.timestamps.duration()
    }

    pub fn is_leaf(&self) -> bool {
        self.shape == Shape::Leaf
    }
}
