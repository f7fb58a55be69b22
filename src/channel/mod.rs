//! # Per-node event channel.
//!
//! Every materialized component owns a handler table. Emitting a
//! [`LifecycleEvent`] on a node invokes the handlers registered for it,
//! **one at a time, in registration order**, awaiting each before the next.
//!
//! ## Contents
//! - [`LifecycleEvent`] closed set of event names
//! - [`Handler`] / [`HandlerFn`] / [`HandlerRef`] async handler abstraction
//! - [`Emission`] payload handed to each handler
//! - [`SubscriptionId`] handle returned by `on`/`once`, accepted by `off`
//!
//! ## Emission rules
//! ```text
//! emit(node, event)
//!   ├─► lock tree, snapshot matching handlers, drop `once` entries, unlock
//!   ├─► for handler in snapshot (registration order):
//!   │       await handler.handle(emission)   (panics caught)
//!   │       Err / panic ──► recorded, next handler still runs
//!   └─► failures? ──► HandlerError (aggregated) to the lifecycle caller
//! ```
//! Handlers added or removed while an emission is in progress do not affect it.
//! The tree lock is never held while a handler runs, so handlers may call back
//! into the controller (e.g. a leaf ending itself).

mod emission;
mod event;
mod handler;
mod table;

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::error::{HandlerError, HandlerFailure};

pub use emission::Emission;
pub use event::LifecycleEvent;
pub use handler::{BoxHandlerFuture, Handler, HandlerFn, HandlerRef};
pub use table::SubscriptionId;

pub(crate) use table::{HandlerTable, Subscription};

/// Runs `handlers` sequentially against `emission`, collecting failures.
pub(crate) async fn dispatch(
    handlers: Vec<HandlerRef>,
    emission: Emission,
) -> Result<(), HandlerError> {
    let mut failures = Vec::new();

    for handler in handlers {
        let em = emission.clone();
        let fut = async move { handler.handle(em).await };

        let message = match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => format!("{err:#}"),
            Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
        };

        failures.push(HandlerFailure {
            component: emission.component(),
            label: emission.label_arc(),
            event: emission.event(),
            message,
        });
    }

    HandlerError::check(failures)
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
