//! # Controller: per-tree coordinator.
//!
//! The [`Controller`] owns the node arena, the event bus and the optional
//! subscriber fan-out for exactly one experiment tree. It is a cheap `Arc`
//! handle: every [`Emission`](crate::Emission) carries a clone, which is how
//! handlers navigate (end their own component, jump, inspect snapshots).
//!
//! ## Architecture
//! ```text
//! Controller (Arc<Inner>)
//!   ├─ cfg:  ControllerConfig
//!   ├─ tree: Mutex<Tree>          arena of Nodes + current_leaf
//!   │          └─ Node { status, locked, parent, sequencer, handlers, timestamps, .. }
//!   ├─ bus:  Bus                  bookkeeping events (skipped nodes included)
//!   └─ subs: SubscriberSet        fed by a listener task (only if non-empty)
//! ```
//!
//! The tree mutex is taken for short, synchronous critical sections only and
//! is never held across an `.await`.
//!
//! ## Example
//! ```rust
//! use studyflow::{Component, ComponentOptions, Controller, EndReason};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), studyflow::LifecycleError> {
//! let study = Component::sequence(
//!     ComponentOptions::new().id("study"),
//!     vec![
//!         Component::leaf(ComponentOptions::new().id("consent").skip(true)),
//!         Component::leaf(ComponentOptions::new().id("instructions")),
//!     ],
//! );
//!
//! let controller = Controller::new(study);
//! controller.run().await?;
//!
//! let leaf = controller.current_leaf().expect("a leaf is on screen");
//! assert_eq!(controller.snapshot(leaf)?.label.as_ref(), "instructions");
//!
//! controller.end(leaf, EndReason::Response).await?;
//! assert!(controller.snapshot(controller.root())?.locked);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::channel::{HandlerRef, LifecycleEvent, Subscription, SubscriptionId};
use crate::components::{Component, ComponentId, ComponentOptions, ComponentSnapshot, Status};
use crate::core::builder::ControllerBuilder;
use crate::core::config::ControllerConfig;
use crate::core::handle::ComponentHandle;
use crate::core::tree::Tree;
use crate::error::StateError;
use crate::events::{Bus, Event};
use crate::subscribers::SubscriberSet;

pub(crate) struct Inner {
    pub(crate) cfg: ControllerConfig,
    pub(crate) tree: Mutex<Tree>,
    pub(crate) bus: Bus,
    pub(crate) root: ComponentId,
    pub(crate) subs: Arc<SubscriberSet>,
}

/// Coordinator of one experiment tree.
#[derive(Clone)]
pub struct Controller {
    pub(crate) inner: Arc<Inner>,
}

impl Controller {
    /// Creates a controller with the default configuration and no subscribers.
    ///
    /// The root description is materialized immediately; its children are
    /// materialized as the tree runs.
    pub fn new(root: Component) -> Self {
        Self::builder(root).build()
    }

    /// Returns a builder for configuring a controller.
    pub fn builder(root: Component) -> ControllerBuilder {
        ControllerBuilder::new(root)
    }

    pub(crate) fn from_parts(
        cfg: ControllerConfig,
        tree: Tree,
        root: ComponentId,
        bus: Bus,
        subs: Arc<SubscriberSet>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cfg,
                tree: Mutex::new(tree),
                bus,
                root,
                subs,
            }),
        }
    }

    /// Id of the root component.
    pub fn root(&self) -> ComponentId {
        self.inner.root
    }

    /// The most recently activated, non-skipped leaf.
    ///
    /// `None` before the first leaf runs and after a rerun cleared it; frozen at
    /// the last leaf once the tree has ended.
    pub fn current_leaf(&self) -> Option<ComponentId> {
        self.inner.tree.lock().current_leaf
    }

    /// Configuration this controller was built with.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.cfg
    }

    /// New receiver of bookkeeping events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subs.len()
    }

    /// Lifecycle handle for a component of this tree.
    ///
    /// The id is not validated here; operations on an unknown id fail with
    /// `StateError::UnknownComponent`.
    pub fn component(&self, id: ComponentId) -> ComponentHandle {
        ComponentHandle::new(self.clone(), id)
    }

    /// Registers a handler invoked on every emission of `event` by `id`.
    pub fn on(
        &self,
        id: ComponentId,
        event: LifecycleEvent,
        handler: HandlerRef,
    ) -> Result<SubscriptionId, StateError> {
        self.subscribe_handler(id, event, handler, false)
    }

    /// Registers a handler invoked on the next emission of `event` by `id` only.
    pub fn once(
        &self,
        id: ComponentId,
        event: LifecycleEvent,
        handler: HandlerRef,
    ) -> Result<SubscriptionId, StateError> {
        self.subscribe_handler(id, event, handler, true)
    }

    /// Removes a handler; `Ok(false)` if it was not registered on `id`.
    pub fn off(&self, id: ComponentId, subscription: SubscriptionId) -> Result<bool, StateError> {
        let mut tree = self.inner.tree.lock();
        Ok(tree.node_mut(id)?.handlers.remove(subscription))
    }

    fn subscribe_handler(
        &self,
        id: ComponentId,
        event: LifecycleEvent,
        handler: HandlerRef,
        once: bool,
    ) -> Result<SubscriptionId, StateError> {
        let mut tree = self.inner.tree.lock();
        let node = tree.node_mut(id)?;
        Ok(node
            .handlers
            .insert(Subscription::new(SubscriptionId::next(), event, handler, once)))
    }

    /// Mutates the options of a component that is not locked.
    pub fn configure<F>(&self, id: ComponentId, f: F) -> Result<(), StateError>
    where
        F: FnOnce(&mut ComponentOptions),
    {
        let mut tree = self.inner.tree.lock();
        let node = tree.node_mut(id)?;
        if node.locked {
            return Err(StateError::Locked { component: id });
        }
        f(&mut node.options);
        node.label = Arc::from(node.options.label());
        Ok(())
    }

    /// Read-only view of a component.
    pub fn snapshot(&self, id: ComponentId) -> Result<ComponentSnapshot, StateError> {
        self.inner.tree.lock().snapshot(id)
    }

    /// Status of a component.
    pub fn status(&self, id: ComponentId) -> Result<Status, StateError> {
        Ok(self.inner.tree.lock().node(id)?.status)
    }

    /// First materialized component whose `id` option equals `label`.
    ///
    /// Children are materialized lazily, so a component not reached yet is
    /// not found.
    pub fn lookup(&self, label: &str) -> Option<ComponentId> {
        self.inner.tree.lock().lookup(label)
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("root", &self.inner.root)
            .field("cfg", &self.inner.cfg)
            .field("current_leaf", &self.current_leaf())
            .finish()
    }
}
