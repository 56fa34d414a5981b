//! Events pushed to run observers.

use serde::Serialize;
use tokio::sync::mpsc;

use super::history::{AttemptResult, RunSummary};

/// Progress notifications of a run, delivered in order. `Finished` is always
/// the last event of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    ValidationFailed {
        message: String,
    },
    RunStarted {
        attempt_count: u32,
    },
    Progress {
        current: u32,
        attempt_count: u32,
    },
    AttemptCompleted {
        result: AttemptResult,
    },
    Finished {
        summary: RunSummary,
        was_cancelled: bool,
    },
}

/// Receiver of run events.
///
/// Called from the run's task, so implementations must be thread-safe and
/// must not block.
pub trait RunObserver: Send + Sync + 'static {
    fn on_event(&self, event: RunEvent);
}

impl RunObserver for mpsc::UnboundedSender<RunEvent> {
    fn on_event(&self, event: RunEvent) {
        if self.send(event).is_err() {
            tracing::trace!("observer channel closed, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_tagged() {
        let json = serde_json::to_value(RunEvent::Progress {
            current: 2,
            attempt_count: 5,
        })
        .unwrap();
        assert_eq!(json["event"], "progress");
        assert_eq!(json["current"], 2);
        assert_eq!(json["attempt_count"], 5);
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.on_event(RunEvent::RunStarted { attempt_count: 1 });
    }
}
