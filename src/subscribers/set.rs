//! # Observer fan-out.
//!
//! Each observer gets an [`Outlet`]: a bounded queue drained by its own worker
//! task. The listener spawned by the controller builder hands every bus event
//! to [`SubscriberSet::emit`], which only enqueues and never waits.
//!
//! ```text
//! emit(event) ──► outlet "log-writer" [queue] ──► worker ──► on_event()
//!             └─► outlet "recorder"   [queue] ──► worker ──► on_event()
//!
//! queue full / closed ──► SubscriberOverflow on the bus (not for overflow events)
//! on_event() panics   ──► SubscriberPanicked on the bus, worker keeps going
//! ```
//!
//! Each observer sees events in bus order; observers are not ordered
//! relative to each other.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::channel::panic_message;
use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Queue and worker of one observer.
struct Outlet {
    name: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
    worker: JoinHandle<()>,
}

impl Outlet {
    fn spawn(sub: Arc<dyn Subscribe>, bus: Bus) -> Self {
        let name = sub.name();
        let (queue, rx) = mpsc::channel(sub.queue_capacity().max(1));
        let worker = tokio::spawn(drive(sub, rx, bus));
        Self {
            name,
            queue,
            worker,
        }
    }

    /// Enqueues `event`; returns why it was dropped, if it was.
    fn offer(&self, event: &Arc<Event>) -> Option<&'static str> {
        match self.queue.try_send(Arc::clone(event)) {
            Ok(()) => None,
            Err(TrySendError::Full(_)) => Some("full"),
            Err(TrySendError::Closed(_)) => Some("closed"),
        }
    }
}

async fn drive(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(event) = rx.recv().await {
        let delivery = AssertUnwindSafe(sub.on_event(&event)).catch_unwind().await;
        if let Err(panic) = delivery {
            let info = panic_message(panic.as_ref()).to_string();
            warn!(subscriber = sub.name(), %info, "subscriber panicked");
            bus.publish(Event::subscriber_panicked(sub.name(), info));
        }
    }
}

/// Observers attached to one controller.
pub struct SubscriberSet {
    outlets: Vec<Outlet>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per observer; must be called within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let outlets = subs
            .into_iter()
            .map(|sub| Outlet::spawn(sub, bus.clone()))
            .collect();
        Self { outlets, bus }
    }

    /// Hands `event` to every observer without waiting for any of them.
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        for outlet in &self.outlets {
            let Some(reason) = outlet.offer(&event) else {
                continue;
            };
            if event.is_subscriber_overflow() {
                continue;
            }
            warn!(subscriber = outlet.name, reason, "subscriber dropped event");
            self.bus
                .publish(Event::subscriber_overflow(outlet.name, reason));
        }
    }

    /// Closes the queues and waits until every worker has drained its queue.
    pub async fn shutdown(self) {
        let workers: Vec<_> = self
            .outlets
            .into_iter()
            .map(|outlet| {
                drop(outlet.queue);
                outlet.worker
            })
            .collect();
        for worker in workers {
            let _ = worker.await;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outlets.is_empty()
    }

    /// Number of attached observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outlets.len()
    }
}
