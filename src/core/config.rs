//! # Controller configuration.
//!
//! Provides [`ControllerConfig`], the settings of one controller instance.
//!
//! ## Sentinel values
//! - `max_depth = 0` → unlimited nesting
//! - `bus_capacity = 0` → clamped to 1

/// Configuration of a [`Controller`](crate::Controller).
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `max_depth`: maximum number of tree levels, root included (`0` = unlimited)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events observe
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Maximum number of tree levels.
    ///
    /// Materializing a child below this depth fails with
    /// `StateError::DepthExceeded`. Guards generated trees that nest without end.
    pub max_depth: usize,
}

impl ControllerConfig {
    /// Returns the depth limit as an `Option` (`None` = unlimited).
    #[inline]
    pub fn depth_limit(&self) -> Option<usize> {
        if self.max_depth == 0 {
            None
        } else {
            Some(self.max_depth)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for ControllerConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `max_depth = 0` (unlimited)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            max_depth: 0,
        }
    }
}
