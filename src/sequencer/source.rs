//! # Child sources.
//!
//! - [`ChildSource::list`] a finite authored list
//! - [`ChildSource::from_fn`] children generated by index, possibly without end
//! - [`ChildSource::template`] one child per parameter row, row values merged
//!   into the produced child's parameters
//!
//! ## Example
//! ```rust
//! use studyflow::{ChildSource, Component, ComponentOptions, Parameters, ParameterValue};
//!
//! let rows: Vec<Parameters> = ["red", "green"]
//!     .into_iter()
//!     .map(|c| [("color".to_string(), ParameterValue::from(c))].into_iter().collect())
//!     .collect();
//!
//! let source = ChildSource::template(rows, |_row, index| {
//!     Component::leaf(ComponentOptions::new().id(format!("trial-{index}")))
//! });
//! assert_eq!(source.produced(), 0);
//! ```

use std::collections::VecDeque;
use std::fmt;

use crate::components::{Component, Parameters};

type Generator = Box<dyn FnMut(usize) -> Option<Component> + Send>;

enum Inner {
    List(VecDeque<Component>),
    Generated(Generator),
}

/// Producer of child descriptions for a container.
pub struct ChildSource {
    inner: Inner,
    produced: usize,
}

impl ChildSource {
    /// Finite list of children, produced in order.
    pub fn list(children: Vec<Component>) -> Self {
        Self {
            inner: Inner::List(children.into()),
            produced: 0,
        }
    }

    /// Children generated by index until `f` returns `None`.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnMut(usize) -> Option<Component> + Send + 'static,
    {
        Self {
            inner: Inner::Generated(Box::new(f)),
            produced: 0,
        }
    }

    /// One child per parameter row, built by `factory(row, index)`.
    ///
    /// The row is merged into the child's parameters; row values win.
    pub fn template<F>(rows: Vec<Parameters>, factory: F) -> Self
    where
        F: Fn(&Parameters, usize) -> Component + Send + 'static,
    {
        Self::from_fn(move |index| {
            let row = rows.get(index)?;
            let mut child = factory(row, index);
            child.options.merge_parameters(row);
            Some(child)
        })
    }

    /// Produces the next child, or `None` once the source is exhausted.
    pub(crate) fn produce(&mut self) -> Option<Component> {
        let next = match &mut self.inner {
            Inner::List(children) => children.pop_front(),
            Inner::Generated(f) => f(self.produced),
        };
        if next.is_some() {
            self.produced += 1;
        }
        next
    }

    /// Number of children produced so far.
    pub fn produced(&self) -> usize {
        self.produced
    }
}

impl From<Vec<Component>> for ChildSource {
    fn from(children: Vec<Component>) -> Self {
        ChildSource::list(children)
    }
}

impl fmt::Debug for ChildSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.inner {
            Inner::List(children) => format!("list(remaining={})", children.len()),
            Inner::Generated(_) => "generated".to_string(),
        };
        f.debug_struct("ChildSource")
            .field("kind", &kind)
            .field("produced", &self.produced)
            .finish()
    }
}
