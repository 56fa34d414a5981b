//! Human-readable rendering of run events for the terminal.

use crate::scheduler::{AttemptOutcome, RunEvent};

/// One line of terminal output for `event`, or `None` for events that only
/// drive progress state.
pub fn render_event(host: &str, event: &RunEvent) -> Option<String> {
    match event {
        RunEvent::ValidationFailed { message } => Some(format!("Invalid parameters: {message}")),
        RunEvent::RunStarted { attempt_count } => Some(format!(
            "Probing {host} ({attempt_count} attempt{})...",
            if *attempt_count == 1 { "" } else { "s" }
        )),
        RunEvent::Progress { .. } => None,
        RunEvent::AttemptCompleted { result } => Some(match result.outcome {
            AttemptOutcome::Success => format!(
                "[{:>2}] reply from {host}: time={} ms",
                result.index, result.elapsed_millis
            ),
            AttemptOutcome::Failure => format!(
                "[{:>2}] failed: {}",
                result.index,
                result.error_detail.as_deref().unwrap_or("no reply")
            ),
        }),
        RunEvent::Finished {
            summary,
            was_cancelled,
        } => {
            let status = if *was_cancelled { "stopped" } else { "completed" };
            Some(format!(
                "--- {host}: {status} ---\n{} of {} attempts run, {} succeeded, {} failed ({:.1}% success)",
                summary.total_attempts,
                summary.requested_attempts,
                summary.success_count,
                summary.failure_count,
                summary.success_rate()
            ))
        }
    }
}
