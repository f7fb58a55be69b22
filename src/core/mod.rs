//! Engine core: the controller and the lifecycle state machine.
//!
//! The public API from this module is [`Controller`] (with its builder and
//! config), [`ComponentHandle`] and [`Jump`].
//!
//! Internal modules:
//! - [`tree`]: node arena, sequencer stepping, subtree reset;
//! - [`lifecycle`]: prepare/run/render/show/end/lock and parent advance;
//! - [`navigation`]: jump and rerun;
//! - [`controller`]: ownership, subscriptions, snapshots and lookups;
//! - [`builder`]: construction and subscriber wiring.

mod builder;
mod config;
mod controller;
mod handle;
mod lifecycle;
mod navigation;
mod tree;

#[cfg(test)]
mod tests;

pub use builder::ControllerBuilder;
pub use config::ControllerConfig;
pub use controller::Controller;
pub use handle::ComponentHandle;
pub use navigation::Jump;
