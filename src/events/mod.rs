//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to bookkeeping events emitted by the controller while it
//! drives a tree, and by subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the controller (every transition, skipped nodes
//!   included), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Controller::subscribe()` receivers, and the subscriber
//!   listener spawned by `ControllerBuilder::build` (fans out to `SubscriberSet`).
//!
//! Unlike lifecycle handlers, bus events never feed back into the tree.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
