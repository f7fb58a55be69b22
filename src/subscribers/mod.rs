//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used to observe controller events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Controller ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet
//!                                                                    │
//!                                                       ┌────────────┼───────────┐
//!                                                       ▼            ▼           ▼
//!                                                   LogWriter    Recorder     Custom
//! ```
//!
//! Subscribers observe; they never drive the tree. Use lifecycle handlers
//! (`Component::on`) for anything that must happen *before* a transition
//! completes.
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use studyflow::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct ShownCounter;
//!
//! #[async_trait]
//! impl Subscribe for ShownCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ComponentShown {
//!             // count presentations
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "shown-counter"
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
