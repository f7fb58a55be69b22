//! Per-component view of a controller.

use crate::channel::{HandlerRef, LifecycleEvent, SubscriptionId};
use crate::components::{ComponentId, ComponentOptions, ComponentSnapshot, EndReason, Status};
use crate::core::controller::Controller;
use crate::core::navigation::Jump;
use crate::error::{LifecycleError, StateError};

/// Lifecycle methods of one component, bound to its controller.
///
/// Obtained from [`Controller::component`] or [`Emission::handle`](crate::Emission::handle).
#[derive(Clone, Debug)]
pub struct ComponentHandle {
    controller: Controller,
    id: ComponentId,
}

impl ComponentHandle {
    pub(crate) fn new(controller: Controller, id: ComponentId) -> Self {
        Self { controller, id }
    }

    /// Id of the bound component.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Controller owning the component.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// See [`Controller::prepare`].
    pub async fn prepare(&self) -> Result<(), LifecycleError> {
        self.controller.prepare(self.id).await
    }

    /// Runs the component; see [`Controller::run_component`].
    pub async fn run(&self) -> Result<(), LifecycleError> {
        self.controller.run_component(self.id).await
    }

    /// See [`Controller::render`].
    pub async fn render(&self) -> Result<(), LifecycleError> {
        self.controller.render(self.id).await
    }

    /// See [`Controller::show`].
    pub async fn show(&self) -> Result<(), LifecycleError> {
        self.controller.show(self.id).await
    }

    /// Ends the component; its parent advances afterwards.
    pub async fn end(&self, reason: impl Into<EndReason>) -> Result<(), LifecycleError> {
        self.controller.end(self.id, reason).await
    }

    /// See [`Controller::lock`].
    pub async fn lock(&self) -> Result<(), LifecycleError> {
        self.controller.lock(self.id).await
    }

    /// Reruns this component's subtree.
    pub async fn reset(&self) -> Result<(), LifecycleError> {
        self.controller.reset(self.id).await
    }

    /// Navigates with this component as the sender.
    pub async fn jump(&self, jump: Jump) -> Result<(), LifecycleError> {
        self.controller.jump(jump, self.id).await
    }

    /// Registers a handler for every emission of `event`.
    pub fn on(&self, event: LifecycleEvent, handler: HandlerRef) -> Result<SubscriptionId, StateError> {
        self.controller.on(self.id, event, handler)
    }

    /// Registers a handler for the next emission of `event` only.
    pub fn once(&self, event: LifecycleEvent, handler: HandlerRef) -> Result<SubscriptionId, StateError> {
        self.controller.once(self.id, event, handler)
    }

    /// Removes a handler; `Ok(false)` if it is not registered here.
    pub fn off(&self, subscription: SubscriptionId) -> Result<bool, StateError> {
        self.controller.off(self.id, subscription)
    }

    /// Mutates the options unless the component is locked.
    pub fn configure<F>(&self, f: F) -> Result<(), StateError>
    where
        F: FnOnce(&mut ComponentOptions),
    {
        self.controller.configure(self.id, f)
    }

    /// Read-only view of the component.
    pub fn snapshot(&self) -> Result<ComponentSnapshot, StateError> {
        self.controller.snapshot(self.id)
    }

    /// Current status.
    pub fn status(&self) -> Result<Status, StateError> {
        self.controller.status(self.id)
    }
}
