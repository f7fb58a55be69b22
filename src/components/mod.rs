//! # Component descriptions and per-node value types.
//!
//! This module provides the types an author uses to describe an experiment tree
//! before it is handed to a [`Controller`](crate::Controller):
//! - [`Component`] - unmaterialized node description (options, kind, handlers)
//! - [`ComponentOptions`] / [`Parameters`] - the configuration bag
//! - [`ComponentId`] - arena id of a materialized node
//! - [`Status`], [`EndReason`], [`Timestamps`] - lifecycle bookkeeping
//! - [`ComponentSnapshot`] - read-only view of a materialized node
//!
//! ## Kinds
//! ```text
//! Component::leaf(opts)                          → unit of presentation
//! Component::sequence(opts, children)            → runs children in order, then ends
//! Component::looped(opts, repetitions, children) → rewinds children on exhaustion
//! ```

mod component;
mod options;
mod snapshot;
mod status;

pub use component::{Component, ComponentId, ComponentKind, Repetitions, Shape};
pub use options::{ComponentOptions, ParameterValue, Parameters};
pub use snapshot::ComponentSnapshot;
pub use status::{EndReason, Status, Timestamps};
