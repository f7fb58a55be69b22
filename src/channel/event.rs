//! Lifecycle event names.

use std::fmt;

/// Events a component emits to its own handlers.
///
/// `Run`, `Render` and `Show` are presentation events and are never emitted by
/// skipped components; `Prepare`, `End` and `Lock` always are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Prepare,
    Run,
    Render,
    Show,
    End,
    Lock,
}

impl LifecycleEvent {
    /// Every event, in lifecycle order.
    pub const ALL: [LifecycleEvent; 6] = [
        LifecycleEvent::Prepare,
        LifecycleEvent::Run,
        LifecycleEvent::Render,
        LifecycleEvent::Show,
        LifecycleEvent::End,
        LifecycleEvent::Lock,
    ];

    /// Returns a short stable label for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleEvent::Prepare => "prepare",
            LifecycleEvent::Run => "run",
            LifecycleEvent::Render => "render",
            LifecycleEvent::Show => "show",
            LifecycleEvent::End => "end",
            LifecycleEvent::Lock => "lock",
        }
    }

    /// `true` for events suppressed on skipped components.
    pub fn is_presentation(&self) -> bool {
        matches!(
            self,
            LifecycleEvent::Run | LifecycleEvent::Render | LifecycleEvent::Show
        )
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
