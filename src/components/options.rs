//! # Component configuration bag.
//!
//! [`ComponentOptions`] carries what the engine understands (`id`, `skip`) plus
//! opaque task-specific [`Parameters`]. Parameter values are typed the same way
//! loop grid columns are typed by the authoring tool: text, number or boolean.
//!
//! ## Example
//! ```rust
//! use studyflow::{ComponentOptions, ParameterValue};
//!
//! let opts = ComponentOptions::new()
//!     .id("stroop-trial")
//!     .parameter("color", "red")
//!     .parameter("congruent", false);
//!
//! assert_eq!(opts.label(), "stroop-trial");
//! assert_eq!(opts.parameters["color"], ParameterValue::Text("red".into()));
//! assert!(!opts.skip);
//! ```

use std::collections::BTreeMap;
use std::fmt;

/// Typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// Categorical value.
    Text(String),
    /// Continuous value.
    Number(f64),
    /// Binary value.
    Boolean(bool),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Text(v) => f.write_str(v),
            ParameterValue::Number(v) => write!(f, "{v}"),
            ParameterValue::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::Text(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Number(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        ParameterValue::Number(f64::from(v))
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Boolean(v)
    }
}

/// Named task parameters, ordered by name.
pub type Parameters = BTreeMap<String, ParameterValue>;

/// Configuration of a single component.
///
/// ## Field semantics
/// - `id`: label, unique only by convention within a sibling set
/// - `skip`: run through the full lifecycle but suppress presentation events
/// - `title`: human-readable name for authoring tools
/// - `parameters`: opaque to the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentOptions {
    pub id: Option<String>,
    pub skip: bool,
    pub title: Option<String>,
    pub parameters: Parameters,
}

impl ComponentOptions {
    /// Empty options: anonymous, not skipped, no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the label.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the skip flag.
    pub fn skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Adds (or replaces) one parameter.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Label used in logs and events; `"<anonymous>"` without an id.
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("<anonymous>")
    }

    /// Merges `row` into the parameters, row values overriding.
    pub(crate) fn merge_parameters(&mut self, row: &Parameters) {
        for (name, value) in row {
            self.parameters.insert(name.clone(), value.clone());
        }
    }
}
