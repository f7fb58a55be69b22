//! Caching sequencer over a [`ChildSource`].

use crate::components::{Component, ComponentId};
use crate::sequencer::ChildSource;

/// Result of [`Sequencer::next`].
#[derive(Debug)]
pub(crate) enum Pulled {
    /// Replay of a child produced in an earlier pass.
    Cached(ComponentId),
    /// First production; the caller materializes it and calls `record`.
    Fresh(Component),
    /// No more children.
    Exhausted,
}

/// Restartable cursor over produced children.
#[derive(Debug)]
pub(crate) struct Sequencer {
    source: Option<ChildSource>,
    produced: Vec<ComponentId>,
    cursor: usize,
}

impl Sequencer {
    pub(crate) fn new(source: ChildSource) -> Self {
        Self {
            source: Some(source),
            produced: Vec::new(),
            cursor: 0,
        }
    }

    pub(crate) fn next(&mut self) -> Pulled {
        if let Some(&id) = self.produced.get(self.cursor) {
            self.cursor += 1;
            return Pulled::Cached(id);
        }
        let Some(source) = self.source.as_mut() else {
            return Pulled::Exhausted;
        };
        match source.produce() {
            Some(component) => Pulled::Fresh(component),
            None => {
                self.source = None;
                Pulled::Exhausted
            }
        }
    }

    /// Records the id of the child returned as `Pulled::Fresh`.
    pub(crate) fn record(&mut self, id: ComponentId) {
        self.produced.push(id);
        self.cursor = self.produced.len();
    }

    /// Rewinds to the first child; nothing is produced again.
    pub(crate) fn reset(&mut self) {
        self.cursor = 0;
    }

    /// The child most recently returned by `next`.
    pub(crate) fn current(&self) -> Option<ComponentId> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.produced.get(i))
            .copied()
    }

    /// Every child produced so far, in order.
    pub(crate) fn produced(&self) -> &[ComponentId] {
        &self.produced
    }
}
