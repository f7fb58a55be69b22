//! # Tree navigation: jump and rerun.
//!
//! ```text
//! jump(Rerun, s)   s running? ─► end(s, Abort) without parent advance
//!                  reset subtree(s) ─► Initialized, unlocked, sequencers rewound
//!                  current leaf inside s? ─► cleared
//!                  prepare(s) ─► run(s) ─► first non-skipped leaf becomes current
//!
//! jump(Next, x)    end(x, Jump) ─► parent advance queued as usual
//! jump(Abort, _)   end(root, Abort) ─► every in-flight node aborted
//! ```
//!
//! Ancestors of the sender are untouched by a rerun: when the rerun sender
//! later ends, its parent advances past it exactly as after its first run.

use std::fmt;

use tracing::debug;

use crate::components::{ComponentId, EndReason, Status};
use crate::core::controller::Controller;
use crate::error::{Deferred, LifecycleError};
use crate::events::EventKind;

/// Navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Jump {
    /// Rewind the sender's subtree and run it again from its first child.
    Rerun,
    /// End the sender (`EndReason::Jump`) and let its parent advance.
    Next,
    /// End the whole tree (`EndReason::Abort`).
    Abort,
}

impl Jump {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Jump::Rerun => "rerun",
            Jump::Next => "next",
            Jump::Abort => "abort",
        }
    }
}

impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl Controller {
    /// Navigates the tree on behalf of `sender`.
    pub async fn jump(&self, jump: Jump, sender: ComponentId) -> Result<(), LifecycleError> {
        self.call(self.navigate(jump, sender)).await
    }

    /// Reruns a component: `jump(Jump::Rerun, id)`.
    pub async fn reset(&self, id: ComponentId) -> Result<(), LifecycleError> {
        self.jump(Jump::Rerun, id).await
    }

    async fn navigate(&self, jump: Jump, sender: ComponentId) -> Result<(), LifecycleError> {
        {
            let tree = self.inner.tree.lock();
            let node = tree.node(sender)?;
            debug!(component = %sender, label = %node.label, %jump, "jump requested");
            self.inner.bus.publish(
                node.event(sender, EventKind::JumpRequested)
                    .with_reason(jump.as_label()),
            );
        }

        match jump {
            Jump::Rerun => self.rerun(sender).await,
            Jump::Next => self.end_node(sender, EndReason::Jump, true).await,
            Jump::Abort => self.end_node(self.root(), EndReason::Abort, true).await,
        }
    }

    async fn rerun(&self, sender: ComponentId) -> Result<(), LifecycleError> {
        self.check_branch(sender)?;

        let mut deferred = Deferred::default();
        if self.status(sender)? == Status::Running {
            deferred.absorb(self.end_node(sender, EndReason::Abort, false).await)?;
        }

        {
            let mut tree = self.inner.tree.lock();
            let rewound = tree.reset_subtree(sender);
            for &id in &rewound {
                if let Ok(node) = tree.node(id) {
                    self.inner.bus.publish(node.event(id, EventKind::ComponentReset));
                }
            }
            debug!(component = %sender, nodes = rewound.len(), "subtree reset");
        }

        deferred.absorb(self.prepare_node(sender).await)?;
        deferred.absorb(self.run_node(sender).await)?;
        deferred.finish()
    }
}
