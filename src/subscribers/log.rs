//! # Logging subscriber for debugging and demos.
//!
//! [`LogWriter`] renders controller events through `tracing`, one line per
//! event. Install a `tracing` subscriber (e.g. `tracing-subscriber` with an
//! `EnvFilter`) to see the output.
//!
//! ## Output format
//! ```text
//! [prepared] component=#1 label=trial
//! [running] component=#1 label=trial iteration=0
//! [leaf] component=#2 label=fixation
//! [ended] component=#2 label=fixation reason=response
//! [ended] component=#3 label=feedback reason=skipped skipped
//! [jump] component=#1 label=trial mode=rerun
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// `tracing` logging subscriber.
///
/// Enabled via the `logging` feature. Transition events are logged at
/// `debug`, navigation at `info`, failures at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let component = e
            .component
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let label = e.label.as_deref().unwrap_or("-");
        let skipped = if e.skipped { " skipped" } else { "" };

        match e.kind {
            EventKind::ComponentPrepared => {
                debug!("[prepared] component={component} label={label}{skipped}");
            }
            EventKind::ComponentRunning => match e.iteration {
                Some(it) => debug!("[running] component={component} label={label} iteration={it}"),
                None => debug!("[running] component={component} label={label}{skipped}"),
            },
            EventKind::ComponentRendered => {
                debug!("[rendered] component={component} label={label}");
            }
            EventKind::ComponentShown => {
                debug!("[shown] component={component} label={label}");
            }
            EventKind::ComponentEnded => {
                let reason = e.reason.as_deref().unwrap_or("-");
                debug!("[ended] component={component} label={label} reason={reason}{skipped}");
            }
            EventKind::ComponentLocked => {
                debug!("[locked] component={component} label={label}");
            }
            EventKind::ComponentReset => {
                info!("[reset] component={component} label={label}");
            }
            EventKind::LeafChanged => {
                info!("[leaf] component={component} label={label}");
            }
            EventKind::JumpRequested => {
                let mode = e.reason.as_deref().unwrap_or("-");
                info!("[jump] component={component} label={label} mode={mode}");
            }
            EventKind::HandlerFailed => {
                warn!("[handler-failed] component={component} label={label} err={:?}", e.reason);
            }
            EventKind::SubscriberPanicked => {
                warn!("[subscriber-panicked] subscriber={label} info={:?}", e.reason);
            }
            EventKind::SubscriberOverflow => {
                warn!("[subscriber-overflow] subscriber={label} reason={:?}", e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
