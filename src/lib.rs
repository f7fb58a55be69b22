//! # studyflow
//!
//! **Studyflow** is a lifecycle engine for trees of experiment components.
//!
//! An experiment is authored as a tree: leaves are individual tasks (a
//! fixation cross, a stimulus, a questionnaire page), sequences and loops are
//! containers. A [`Controller`] drives the tree through a shared lifecycle so
//! that exactly one leaf is on screen at a time, ordering is deterministic,
//! teardown is clean, and any subtree can be restarted from a known point.
//!
//! The crate does not render anything. Leaf content is supplied by handlers
//! subscribed to lifecycle events; the engine only orchestrates transitions.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌────────────────────────────────────────────────────────────┐
//!     │  Component descriptions (authored)                         │
//!     │  leaf / sequence(ChildSource) / looped(Repetitions, ..)    │
//!     └──────────────────────────────┬─────────────────────────────┘
//!                                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Controller (one per tree)                                        │
//! │  - Tree arena: Node { status, locked, parent, sequencer, .. }     │
//! │  - current_leaf                                                   │
//! │  - Bus (broadcast bookkeeping events)                             │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────────────────────────────────────┬─────────┘
//!        │ emit(LifecycleEvent)                             │ publish(Event)
//!        ▼                                                  ▼
//!   per-node handlers                            ┌────────────────────┐
//!   (awaited in order,                           │ Bus ─► listener ─► │
//!    may navigate)                               │ SubscriberSet      │
//!                                                └────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Initialized ─► Prepared ─► Running ─► Done (locked)
//!      ▲                                  │
//!      └──────── jump(Rerun) / reset ◄────┘
//!
//! run(container)  ─► Run ─► advance ─► run(first child) ─► ... ─► leaf becomes current
//! end(leaf)       ─► End ─► Lock ─► parent advances ─► next child | next loop pass | end(parent)
//! run(skipped)    ─► end(Skipped) immediately, no Run/Render/Show
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                              |
//! |-------------------|----------------------------------------------------------|-------------------------------------------------|
//! | **Components**    | Describe leaves, sequences and loops.                    | [`Component`], [`ComponentOptions`]             |
//! | **Children**      | Lazy, cached, restartable child production.              | [`ChildSource`]                                 |
//! | **Handlers**      | Async per-node lifecycle hooks.                          | [`Handler`], [`HandlerFn`], [`LifecycleEvent`]  |
//! | **Navigation**    | Current leaf, skip-ahead, rerun, abort.                  | [`Controller`], [`Jump`], [`ComponentHandle`]   |
//! | **Observation**   | Tree-wide bookkeeping events and subscribers.            | [`Event`], [`EventKind`], [`Subscribe`]         |
//! | **Errors**        | Typed state and handler errors.                          | [`StateError`], [`HandlerError`]                |
//! | **Configuration** | Bus capacity and depth limit.                            | [`ControllerConfig`]                            |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber that renders bus events through `tracing`.
//!
//! ## Example
//! ```rust
//! use studyflow::{
//!     Component, ComponentOptions, Controller, EndReason, Emission, HandlerFn, Jump,
//!     LifecycleEvent, Repetitions,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A trial that ends itself as soon as it is shown.
//!     let trial = Component::leaf(ComponentOptions::new().id("trial")).on(
//!         LifecycleEvent::Show,
//!         HandlerFn::arc(|e: Emission| async move {
//!             e.handle().end(EndReason::Timeout).await?;
//!             anyhow::Ok(())
//!         }),
//!     );
//!
//!     let study = Component::sequence(
//!         ComponentOptions::new().id("study"),
//!         vec![
//!             Component::leaf(ComponentOptions::new().id("welcome")),
//!             Component::looped(ComponentOptions::new().id("block"), Repetitions::Times(3), vec![trial]),
//!             Component::leaf(ComponentOptions::new().id("debrief")),
//!         ],
//!     );
//!
//!     let controller = Controller::new(study);
//!     controller.run().await?;
//!
//!     // The participant clicks through the welcome page.
//!     let welcome = controller.current_leaf().expect("welcome is shown");
//!     controller.end(welcome, "response").await?;
//!
//!     // The loop ran its three trials on its own; the debriefing is on screen.
//!     let debrief = controller.lookup("debrief").expect("debrief materialized");
//!     assert_eq!(controller.current_leaf(), Some(debrief));
//!
//!     // Start the whole study over.
//!     controller.jump(Jump::Rerun, controller.root()).await?;
//!     assert_eq!(controller.current_leaf(), Some(welcome));
//!     Ok(())
//! }
//! ```
mod channel;
mod components;
mod core;
mod error;
mod events;
mod sequencer;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{ComponentHandle, Controller, ControllerBuilder, ControllerConfig, Jump};
pub use channel::{
    BoxHandlerFuture, Emission, Handler, HandlerFn, HandlerRef, LifecycleEvent, SubscriptionId,
};
pub use components::{
    Component, ComponentId, ComponentKind, ComponentOptions, ComponentSnapshot, EndReason,
    ParameterValue, Parameters, Repetitions, Shape, Status, Timestamps,
};
pub use error::{HandlerError, HandlerFailure, LifecycleError, StateError};
pub use events::{Bus, Event, EventKind};
pub use sequencer::ChildSource;
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
