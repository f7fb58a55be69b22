//! # Node arena.
//!
//! Every materialized component lives in one [`Tree`] owned by its controller.
//! Parents, children and the controller itself are lookups by [`ComponentId`],
//! never owning references.
//!
//! The tree is plain data: it never awaits and never emits. The controller
//! locks it, mutates it, publishes bus events and releases it before any
//! handler runs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crate::channel::HandlerTable;
use crate::components::{
    Component, ComponentId, ComponentKind, ComponentOptions, ComponentSnapshot, EndReason,
    Repetitions, Shape, Status, Timestamps,
};
use crate::error::StateError;
use crate::events::{Event, EventKind};
use crate::sequencer::{Pulled, Sequencer};

/// One materialized component.
pub(crate) struct Node {
    pub(crate) options: ComponentOptions,
    pub(crate) label: Arc<str>,
    pub(crate) shape: Shape,
    pub(crate) status: Status,
    pub(crate) locked: bool,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) depth: usize,
    pub(crate) sequencer: Option<Sequencer>,
    pub(crate) handlers: HandlerTable,
    pub(crate) timestamps: Timestamps,
    pub(crate) end_reason: Option<EndReason>,
    /// Loop pass, 0-based.
    pub(crate) iteration: u32,
    /// Leaf activation count when the current loop pass started.
    pub(crate) pass_mark: u64,
    /// Bumped on every rewind.
    pub(crate) generation: u64,
}

impl Node {
    pub(crate) fn is_leaf(&self) -> bool {
        self.shape == Shape::Leaf
    }

    /// Current loop pass, for loop nodes only.
    pub(crate) fn loop_iteration(&self) -> Option<u32> {
        matches!(self.shape, Shape::Loop(_)).then_some(self.iteration)
    }

    /// Bus event about this node.
    pub(crate) fn event(&self, id: ComponentId, kind: EventKind) -> Event {
        let ev = Event::new(kind)
            .with_component(id)
            .with_label(Arc::clone(&self.label))
            .with_skipped(self.options.skip);
        match self.loop_iteration() {
            Some(it) => ev.with_iteration(it),
            None => ev,
        }
    }

    fn rewind(&mut self) {
        self.status = Status::Initialized;
        self.locked = false;
        self.timestamps = Timestamps::default();
        self.end_reason = None;
        self.iteration = 0;
        self.generation += 1;
        if let Some(seq) = self.sequencer.as_mut() {
            seq.reset();
        }
    }
}

/// What a container does next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    /// Run this child.
    Run(ComponentId),
    /// A loop started its next pass; these nodes were rewound.
    Repeat { iteration: u32, reset: Vec<ComponentId> },
    /// No children left; the container ends.
    Exhausted,
}

/// Parent advance requested by a child that ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingAdvance {
    container: ComponentId,
    child: ComponentId,
    /// Child generation at the time it ended.
    generation: u64,
}

pub(crate) struct Tree {
    nodes: Vec<Node>,
    max_depth: Option<usize>,
    pub(crate) current_leaf: Option<ComponentId>,
    /// Number of leaf activations since the controller was built.
    pub(crate) leaf_activations: u64,
    /// Public lifecycle calls currently in flight.
    pub(crate) active_calls: usize,
    pending: VecDeque<PendingAdvance>,
}

impl Tree {
    pub(crate) fn new(max_depth: Option<usize>) -> Self {
        Self {
            nodes: Vec::new(),
            max_depth,
            current_leaf: None,
            leaf_activations: 0,
            active_calls: 0,
            pending: VecDeque::new(),
        }
    }

    /// Materializes the root description.
    pub(crate) fn insert_root(&mut self, component: Component) -> ComponentId {
        self.push(component, None, 0)
    }

    /// Materializes a child description below `parent`.
    pub(crate) fn insert(
        &mut self,
        component: Component,
        parent: ComponentId,
    ) -> Result<ComponentId, StateError> {
        let depth = self.node(parent)?.depth + 1;
        if let Some(max) = self.max_depth {
            if depth >= max {
                return Err(StateError::DepthExceeded { depth, max });
            }
        }
        Ok(self.push(component, Some(parent), depth))
    }

    fn push(&mut self, component: Component, parent: Option<ComponentId>, depth: usize) -> ComponentId {
        let Component {
            options,
            kind,
            subscriptions,
        } = component;

        let (shape, sequencer) = match kind {
            ComponentKind::Leaf => (Shape::Leaf, None),
            ComponentKind::Sequence(source) => (Shape::Sequence, Some(Sequencer::new(source))),
            ComponentKind::Loop {
                source,
                repetitions,
            } => (Shape::Loop(repetitions), Some(Sequencer::new(source))),
        };

        let mut handlers = HandlerTable::default();
        for sub in subscriptions {
            handlers.insert(sub);
        }

        let id = ComponentId::from_index(self.nodes.len());
        self.nodes.push(Node {
            label: Arc::from(options.label()),
            options,
            shape,
            status: Status::Initialized,
            locked: false,
            parent,
            depth,
            sequencer,
            handlers,
            timestamps: Timestamps::default(),
            end_reason: None,
            iteration: 0,
            pass_mark: 0,
            generation: 0,
        });
        id
    }

    pub(crate) fn node(&self, id: ComponentId) -> Result<&Node, StateError> {
        self.nodes
            .get(id.index())
            .ok_or(StateError::UnknownComponent { component: id })
    }

    pub(crate) fn node_mut(&mut self, id: ComponentId) -> Result<&mut Node, StateError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(StateError::UnknownComponent { component: id })
    }

    /// Children materialized so far.
    pub(crate) fn children(&self, id: ComponentId) -> Vec<ComponentId> {
        self.nodes
            .get(id.index())
            .and_then(|n| n.sequencer.as_ref())
            .map(|s| s.produced().to_vec())
            .unwrap_or_default()
    }

    /// `true` if `ancestor` is `id` or lies on its parent chain.
    pub(crate) fn is_ancestor_or_self(&self, ancestor: ComponentId, id: ComponentId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current.index()).and_then(|n| n.parent);
        }
        false
    }

    /// A running node that is neither an ancestor nor a descendant of `target`.
    pub(crate) fn conflicting_branch(&self, target: ComponentId) -> Option<ComponentId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.status == Status::Running)
            .map(|(i, _)| ComponentId::from_index(i))
            .find(|&id| !self.is_ancestor_or_self(id, target) && !self.is_ancestor_or_self(target, id))
    }

    /// `id` and its materialized descendants, pre-order.
    pub(crate) fn subtree(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut kids = self.children(current);
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Rewinds `id` and its descendants to `Initialized`.
    ///
    /// Clears `current_leaf` if it lies inside; returns the rewound ids.
    pub(crate) fn reset_subtree(&mut self, id: ComponentId) -> Vec<ComponentId> {
        let ids = self.subtree(id);
        for &n in &ids {
            if let Some(node) = self.nodes.get_mut(n.index()) {
                node.rewind();
            }
        }
        if self.current_leaf.is_some_and(|leaf| ids.contains(&leaf)) {
            self.current_leaf = None;
        }
        ids
    }

    /// Pulls the next child of a container, materializing it on first production.
    ///
    /// Loops with passes left rewind their children and report `Step::Repeat`.
    pub(crate) fn pull_next(&mut self, container: ComponentId) -> Result<Step, StateError> {
        let activations = self.leaf_activations;
        let node = self.node_mut(container)?;
        let shape = node.shape;
        let iteration = node.iteration;
        let pass_mark = node.pass_mark;
        let Some(seq) = node.sequencer.as_mut() else {
            return Ok(Step::Exhausted);
        };

        match seq.next() {
            Pulled::Cached(id) => Ok(Step::Run(id)),
            Pulled::Fresh(component) => {
                let id = self.insert(component, container)?;
                if let Some(seq) = self.node_mut(container)?.sequencer.as_mut() {
                    seq.record(id);
                }
                Ok(Step::Run(id))
            }
            Pulled::Exhausted => {
                let Shape::Loop(repetitions) = shape else {
                    return Ok(Step::Exhausted);
                };
                let productive = activations > pass_mark;
                if !repetitions.allows_another(iteration)
                    || (repetitions == Repetitions::Unbounded && !productive)
                {
                    return Ok(Step::Exhausted);
                }

                let kids = seq.produced().to_vec();
                seq.reset();
                node.iteration = iteration + 1;
                node.pass_mark = activations;

                let mut reset = Vec::new();
                for kid in kids {
                    reset.extend(self.rewind_keep_leaf(kid));
                }
                Ok(Step::Repeat {
                    iteration: iteration + 1,
                    reset,
                })
            }
        }
    }

    /// Like `reset_subtree`, but leaves `current_leaf` in place.
    fn rewind_keep_leaf(&mut self, id: ComponentId) -> Vec<ComponentId> {
        let current = self.current_leaf;
        let ids = self.reset_subtree(id);
        self.current_leaf = current;
        ids
    }

    /// Queues the advance of `child`'s parent; no-op for the root.
    pub(crate) fn request_advance(&mut self, child: ComponentId) -> Result<(), StateError> {
        let node = self.node(child)?;
        if let Some(container) = node.parent {
            self.pending.push_back(PendingAdvance {
                container,
                child,
                generation: node.generation,
            });
        }
        Ok(())
    }

    /// Pops queued advances until one is still due and returns its container.
    ///
    /// An advance is due while the container runs, its sequencer still points
    /// at the child, and the child is done in the generation that queued it.
    pub(crate) fn next_advance(&mut self) -> Option<ComponentId> {
        while let Some(req) = self.pending.pop_front() {
            if self.is_due(req) {
                return Some(req.container);
            }
        }
        None
    }

    fn is_due(&self, req: PendingAdvance) -> bool {
        let (Ok(container), Ok(child)) = (self.node(req.container), self.node(req.child)) else {
            return false;
        };
        container.status == Status::Running
            && container.sequencer.as_ref().and_then(|s| s.current()) == Some(req.child)
            && child.status == Status::Done
            && child.generation == req.generation
    }

    pub(crate) fn discard_pending(&mut self) {
        self.pending.clear();
    }

    /// First materialized node whose `id` option equals `label`.
    pub(crate) fn lookup(&self, label: &str) -> Option<ComponentId> {
        self.nodes
            .iter()
            .position(|n| n.options.id.as_deref() == Some(label))
            .map(ComponentId::from_index)
    }

    pub(crate) fn snapshot(&self, id: ComponentId) -> Result<ComponentSnapshot, StateError> {
        let node = self.node(id)?;
        Ok(ComponentSnapshot {
            id,
            label: Arc::clone(&node.label),
            title: node.options.title.clone(),
            shape: node.shape,
            status: node.status,
            locked: node.locked,
            skip: node.options.skip,
            parent: node.parent,
            children: self.children(id),
            timestamps: node.timestamps,
            end_reason: node.end_reason.clone(),
            iteration: node.iteration,
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

pub(crate) fn now() -> Option<Instant> {
    Some(Instant::now())
}
