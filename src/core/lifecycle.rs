//! # Lifecycle transitions.
//!
//! Every transition follows the same shape:
//! ```text
//! lock tree ─► check status ─► mutate node ─► publish bus event ─► unlock
//!           ─► emit lifecycle event to the node's handlers (may suspend)
//!           ─► continue propagation (render/show, descend, queue parent advance)
//! ```
//!
//! ## Propagation
//! ```text
//! run(container) ─► Run ─► advance ─► run(child) ─► ... ─► run(leaf) ─► Run, Render, Show
//!
//! end(leaf) ─► End ─► lock ─► queue parent advance
//!
//! outermost call drains the queue:
//!   parent.advance ├─ next child ─► run(child)
//!                  ├─ loop pass  ─► rewind children ─► run(first child)
//!                  └─ exhausted  ─► end(parent, Completed) ─► queue grandparent advance
//! ```
//!
//! Descending nests one future per tree level. Moving to a sibling never
//! nests: an ended child only queues its parent's advance, and the last public
//! call in flight drains the queue in a loop. A handler that ends its own
//! component therefore returns before the next sibling starts; the sibling
//! runs once the call that emitted to the handler finishes its own work.
//!
//! Skipped nodes take the same path but end themselves (`Skipped`) right after
//! entering `Running`, so a chain of skipped siblings is crossed within one call.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, trace, warn};

use crate::channel::{self, Emission, LifecycleEvent};
use crate::components::{ComponentId, EndReason, Status};
use crate::core::controller::Controller;
use crate::core::tree::{Step, now};
use crate::error::{Deferred, HandlerError, LifecycleError, StateError};
use crate::events::{Event, EventKind};

/// Counts one public call as in flight until it is closed or dropped.
struct CallScope<'a> {
    controller: &'a Controller,
    open: bool,
}

impl Drop for CallScope<'_> {
    fn drop(&mut self) {
        if self.open {
            self.controller.inner.tree.lock().active_calls -= 1;
        }
    }
}

impl Controller {
    /// Runs the root component.
    pub async fn run(&self) -> Result<(), LifecycleError> {
        self.run_component(self.root()).await
    }

    /// Prepares a component: rewinds its sequencer and emits `Prepare`.
    ///
    /// A second call within one generation is a no-op.
    pub async fn prepare(&self, id: ComponentId) -> Result<(), LifecycleError> {
        self.call(self.prepare_node(id)).await
    }

    /// Runs a component, preparing it first if needed.
    ///
    /// Rejected while a component outside `id`'s ancestor chain and subtree is running.
    pub async fn run_component(&self, id: ComponentId) -> Result<(), LifecycleError> {
        self.call(async {
            self.check_branch(id)?;
            self.run_node(id).await
        })
        .await
    }

    /// Emits `Render` on a running, non-skipped leaf. No-op for containers.
    pub async fn render(&self, id: ComponentId) -> Result<(), LifecycleError> {
        self.call(self.present(id, LifecycleEvent::Render)).await
    }

    /// Emits `Show` on a running, non-skipped leaf. No-op for containers.
    pub async fn show(&self, id: ComponentId) -> Result<(), LifecycleError> {
        self.call(self.present(id, LifecycleEvent::Show)).await
    }

    /// Ends a component; its parent then advances.
    ///
    /// Ending an ended component is a no-op. Called from a handler, the parent
    /// advances after the emitting call has finished.
    pub async fn end(
        &self,
        id: ComponentId,
        reason: impl Into<EndReason>,
    ) -> Result<(), LifecycleError> {
        self.call(self.end_node(id, reason.into(), true)).await
    }

    /// Locks a component against `prepare`, `run` and `configure` until it is reset.
    pub async fn lock(&self, id: ComponentId) -> Result<(), LifecycleError> {
        self.call(self.lock_node(id)).await
    }

    /// Runs one public operation, then drains queued parent advances if no
    /// other call is still in flight.
    ///
    /// A state error discards the queue once the last call leaves.
    pub(crate) async fn call<F>(&self, op: F) -> Result<(), LifecycleError>
    where
        F: Future<Output = Result<(), LifecycleError>>,
    {
        self.inner.tree.lock().active_calls += 1;
        let mut scope = CallScope {
            controller: self,
            open: true,
        };

        let mut deferred = Deferred::default();
        let mut outcome = deferred.absorb(op.await);
        loop {
            let next = {
                let mut tree = self.inner.tree.lock();
                let last = tree.active_calls == 1;
                let next = match &outcome {
                    Ok(()) if last => tree.next_advance(),
                    Ok(()) => None,
                    Err(_) => {
                        if last {
                            tree.discard_pending();
                        }
                        None
                    }
                };
                if next.is_none() {
                    tree.active_calls -= 1;
                    scope.open = false;
                }
                next
            };
            let Some(container) = next else {
                break;
            };
            trace!(component = %container, "draining advance");
            outcome = deferred.absorb(self.advance(container).await);
        }

        outcome?;
        deferred.finish()
    }

    pub(crate) fn check_branch(&self, id: ComponentId) -> Result<(), StateError> {
        let tree = self.inner.tree.lock();
        tree.node(id)?;
        match tree.conflicting_branch(id) {
            Some(active) => Err(StateError::ConflictingBranch {
                component: id,
                active,
            }),
            None => Ok(()),
        }
    }

    pub(crate) async fn prepare_node(&self, id: ComponentId) -> Result<(), LifecycleError> {
        {
            let mut tree = self.inner.tree.lock();
            let activations = tree.leaf_activations;
            let node = tree.node_mut(id)?;
            match node.status {
                Status::Running => return Err(StateError::AlreadyRunning { component: id }.into()),
                Status::Done => return Err(StateError::AlreadyEnded { component: id }.into()),
                _ if node.locked => return Err(StateError::Locked { component: id }.into()),
                Status::Prepared => return Ok(()),
                Status::Initialized => {}
            }

            node.status = Status::Prepared;
            node.timestamps.prepare = now();
            node.pass_mark = activations;
            if let Some(seq) = node.sequencer.as_mut() {
                seq.reset();
            }
            trace!(component = %id, label = %node.label, "prepared");
            self.inner
                .bus
                .publish(node.event(id, EventKind::ComponentPrepared));
        }

        self.emit(id, LifecycleEvent::Prepare, None).await?;
        Ok(())
    }

    pub(crate) fn run_node(&self, id: ComponentId) -> BoxFuture<'static, Result<(), LifecycleError>> {
        let this = self.clone();
        async move { this.run_inner(id).await }.boxed()
    }

    async fn run_inner(&self, id: ComponentId) -> Result<(), LifecycleError> {
        let mut deferred = Deferred::default();
        if self.status(id)? == Status::Initialized {
            deferred.absorb(self.prepare_node(id).await)?;
        }

        let (skip, is_leaf, generation) = {
            let mut tree = self.inner.tree.lock();
            let node = tree.node_mut(id)?;
            match node.status {
                Status::Running => return Err(StateError::AlreadyRunning { component: id }.into()),
                Status::Done => return Err(StateError::AlreadyEnded { component: id }.into()),
                _ if node.locked => return Err(StateError::Locked { component: id }.into()),
                _ => {}
            }

            node.status = Status::Running;
            node.timestamps.run = now();
            let skip = node.options.skip;
            let is_leaf = node.is_leaf();
            let generation = node.generation;
            debug!(component = %id, label = %node.label, skip, "running");
            self.inner
                .bus
                .publish(node.event(id, EventKind::ComponentRunning));

            if is_leaf && !skip {
                let changed = node.event(id, EventKind::LeafChanged);
                tree.current_leaf = Some(id);
                tree.leaf_activations += 1;
                self.inner.bus.publish(changed);
            }
            (skip, is_leaf, generation)
        };

        if skip {
            deferred.absorb(self.end_node(id, EndReason::Skipped, true).await)?;
            return deferred.finish();
        }

        deferred.absorb_handler(self.emit(id, LifecycleEvent::Run, None).await);

        if is_leaf {
            // a handler may already have ended or rerun the leaf
            for event in [LifecycleEvent::Render, LifecycleEvent::Show] {
                if !self.still_running(id, generation)? {
                    break;
                }
                deferred.absorb(self.present(id, event).await)?;
            }
        } else if self.still_running(id, generation)? {
            deferred.absorb(self.advance(id).await)?;
        }
        deferred.finish()
    }

    /// `true` if `id` is running in the generation that `run` started.
    fn still_running(&self, id: ComponentId, generation: u64) -> Result<bool, StateError> {
        let tree = self.inner.tree.lock();
        let node = tree.node(id)?;
        Ok(node.status == Status::Running && node.generation == generation)
    }

    async fn present(&self, id: ComponentId, event: LifecycleEvent) -> Result<(), LifecycleError> {
        {
            let mut tree = self.inner.tree.lock();
            let node = tree.node_mut(id)?;
            if !node.is_leaf() || node.options.skip {
                return Ok(());
            }
            if node.status != Status::Running {
                return Err(StateError::NotRunning {
                    component: id,
                    status: node.status,
                }
                .into());
            }

            let kind = if event == LifecycleEvent::Render {
                node.timestamps.render = now();
                EventKind::ComponentRendered
            } else {
                node.timestamps.show = now();
                EventKind::ComponentShown
            };
            trace!(component = %id, label = %node.label, %event, "presenting");
            self.inner.bus.publish(node.event(id, kind));
        }

        self.emit(id, event, None).await?;
        Ok(())
    }

    pub(crate) fn end_node(
        &self,
        id: ComponentId,
        reason: EndReason,
        notify_parent: bool,
    ) -> BoxFuture<'static, Result<(), LifecycleError>> {
        let this = self.clone();
        async move { this.end_inner(id, reason, notify_parent).await }.boxed()
    }

    async fn end_inner(
        &self,
        id: ComponentId,
        reason: EndReason,
        notify_parent: bool,
    ) -> Result<(), LifecycleError> {
        let (generation, in_flight) = {
            let mut tree = self.inner.tree.lock();
            let node = tree.node_mut(id)?;
            if node.status == Status::Done {
                return Ok(());
            }

            node.status = Status::Done;
            node.timestamps.end = now();
            node.end_reason = Some(reason.clone());
            let generation = node.generation;
            debug!(component = %id, label = %node.label, %reason, "ended");
            self.inner.bus.publish(
                node.event(id, EventKind::ComponentEnded)
                    .with_reason(reason.as_label()),
            );

            let current = node.sequencer.as_ref().and_then(|s| s.current());
            let in_flight = current.filter(|&child| {
                tree.node(child)
                    .is_ok_and(|n| matches!(n.status, Status::Prepared | Status::Running))
            });
            (generation, in_flight)
        };

        let mut deferred = Deferred::default();
        if let Some(child) = in_flight {
            deferred.absorb(self.end_node(child, EndReason::Abort, false).await)?;
        }
        deferred.absorb_handler(self.emit(id, LifecycleEvent::End, Some(reason)).await);

        // an End handler may have rerun this node or one of its ancestors
        if self.still_ended(id, generation)? {
            deferred.absorb(self.lock_node(id).await)?;
            if notify_parent {
                self.inner.tree.lock().request_advance(id)?;
            }
        }
        deferred.finish()
    }

    /// `true` if `id` is still done in the generation that `end` finished.
    fn still_ended(&self, id: ComponentId, generation: u64) -> Result<bool, StateError> {
        let tree = self.inner.tree.lock();
        let node = tree.node(id)?;
        Ok(node.status == Status::Done && node.generation == generation)
    }

    pub(crate) async fn lock_node(&self, id: ComponentId) -> Result<(), LifecycleError> {
        {
            let mut tree = self.inner.tree.lock();
            let node = tree.node_mut(id)?;
            if node.locked {
                return Ok(());
            }
            node.locked = true;
            node.timestamps.lock = now();
            trace!(component = %id, label = %node.label, "locked");
            self.inner
                .bus
                .publish(node.event(id, EventKind::ComponentLocked));
        }

        self.emit(id, LifecycleEvent::Lock, None).await?;
        Ok(())
    }

    /// Moves a running container to its next child, next loop pass, or end.
    ///
    /// An exhausted container ends and queues its own parent's advance.
    pub(crate) fn advance(
        &self,
        container: ComponentId,
    ) -> BoxFuture<'static, Result<(), LifecycleError>> {
        let this = self.clone();
        async move { this.advance_inner(container).await }.boxed()
    }

    async fn advance_inner(&self, container: ComponentId) -> Result<(), LifecycleError> {
        loop {
            let step = {
                let mut tree = self.inner.tree.lock();
                if tree.node(container)?.status != Status::Running {
                    return Ok(());
                }
                let step = tree.pull_next(container)?;
                if let Step::Repeat { iteration, reset } = &step {
                    for &n in reset {
                        if let Ok(node) = tree.node(n) {
                            self.inner.bus.publish(node.event(n, EventKind::ComponentReset));
                        }
                    }
                    let node = tree.node(container)?;
                    debug!(component = %container, label = %node.label, iteration, "loop pass");
                    self.inner
                        .bus
                        .publish(node.event(container, EventKind::ComponentRunning));
                }
                step
            };

            match step {
                Step::Run(child) => return self.run_node(child).await,
                Step::Repeat { .. } => continue,
                Step::Exhausted => {
                    return self
                        .end_node(container, EndReason::Completed, true)
                        .await;
                }
            }
        }
    }

    /// Invokes `id`'s handlers for `event`, in registration order.
    pub(crate) async fn emit(
        &self,
        id: ComponentId,
        event: LifecycleEvent,
        reason: Option<EndReason>,
    ) -> Result<(), HandlerError> {
        let (handlers, label) = {
            let mut tree = self.inner.tree.lock();
            let Ok(node) = tree.node_mut(id) else {
                return Ok(());
            };
            (node.handlers.snapshot(event), Arc::clone(&node.label))
        };
        if handlers.is_empty() {
            return Ok(());
        }

        trace!(component = %id, %label, %event, handlers = handlers.len(), "emitting");
        let emission = Emission::new(self.clone(), id, Arc::clone(&label), event, reason);
        let res = channel::dispatch(handlers, emission).await;

        if let Err(err) = &res {
            warn!(
                component = %id,
                %label,
                %event,
                failures = err.len(),
                error = %err.as_message(),
                "lifecycle handlers failed"
            );
            self.inner.bus.publish(
                Event::new(EventKind::HandlerFailed)
                    .with_component(id)
                    .with_label(label)
                    .with_reason(err.as_message()),
            );
        }
        res
    }
}
