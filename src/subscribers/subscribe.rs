//! # Observer trait
//!
//! A [`Subscribe`] implementation watches bus events of one controller. It is
//! fed by its own worker task and queue inside the
//! [`SubscriberSet`](crate::subscribers::SubscriberSet), so a slow observer
//! (disk, network, batching) never stalls the tree or its siblings.
//!
//! When a queue is full the event is dropped for that observer only and a
//! `SubscriberOverflow` event is published instead.

use async_trait::async_trait;

use crate::events::Event;

/// Observer of controller bus events.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Called once per event, in bus order, from this observer's worker.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow and panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Bound of this observer's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
