//! # Child sequencer: restartable, lazy producer of children.
//!
//! Containers never hold a materialized child array. A [`ChildSource`]
//! produces child descriptions on demand; the [`Sequencer`] caches the id of
//! every child it produced and replays them after [`Sequencer::reset`], so
//! child construction happens **once** no matter how often a container reruns.
//!
//! ## Flow
//! ```text
//! Sequencer::next()
//!   ├─ cursor < produced.len() ─► Pulled::Cached(id)          (replay)
//!   ├─ source.produce() = Some  ─► Pulled::Fresh(component)   (engine materializes,
//!   │                                                         then calls record(id))
//!   └─ source.produce() = None  ─► Pulled::Exhausted          (source dropped)
//! ```
//!
//! Exhaustion is a normal signal: sequences end, loops rewind.

mod sequencer;
mod source;

pub use source::ChildSource;

pub(crate) use sequencer::{Pulled, Sequencer};
