use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::{
    components::Component,
    core::{config::ControllerConfig, controller::Controller, tree::Tree},
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Controller`] with optional features.
pub struct ControllerBuilder {
    root: Component,
    cfg: ControllerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ControllerBuilder {
    /// Creates a builder with the default configuration.
    pub fn new(root: Component) -> Self {
        Self {
            root,
            cfg: ControllerConfig::default(),
            subscribers: Vec::new(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: ControllerConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive bus events through dedicated workers with bounded
    /// queues. With at least one subscriber, `build` must be called from
    /// within a tokio runtime.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the controller and materializes the root.
    pub fn build(self) -> Controller {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let mut tree = Tree::new(self.cfg.depth_limit());
        let root = tree.insert_root(self.root);

        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        if !subs.is_empty() {
            subscriber_listener(&bus, Arc::clone(&subs));
        }

        Controller::from_parts(self.cfg, tree, root, bus, subs)
    }
}

/// Forwards bus events to the subscriber set (fire-and-forget).
fn subscriber_listener(bus: &Bus, set: Arc<SubscriberSet>) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
