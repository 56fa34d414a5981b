use crate::probes::Probe;
use crate::scheduler::events::{RunEvent, RunObserver};
use crate::scheduler::history::{AttemptResult, RunReport, RunSummary};
use crate::scheduler::params::RunParameters;
use crate::scheduler::{RunHandle, RunSettings};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything one run's task owns.
pub(crate) struct RunContext {
    pub handle: RunHandle,
    pub params: RunParameters,
    pub settings: RunSettings,
    pub probe: Arc<dyn Probe>,
    pub observer: Arc<dyn RunObserver>,
    pub cancel: CancellationToken,
}

/// Attempt loop of a single run.
///
/// Cancellation is observed before each attempt and during the pause between
/// attempts. An attempt already in flight runs to completion or its timeout.
pub(crate) async fn run_attempts(ctx: RunContext) -> RunReport {
    let host = ctx.params.host();
    let attempt_count = ctx.params.attempt_count();

    info!(run = %ctx.handle, %host, attempt_count, "Probe run started");
    ctx.observer.on_event(RunEvent::RunStarted { attempt_count });

    let mut results = Vec::with_capacity(attempt_count as usize);
    let mut success_count = 0u32;
    let mut failure_count = 0u32;
    let mut cancelled = false;

    for index in 1..=attempt_count {
        if ctx.cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        ctx.observer.on_event(RunEvent::Progress {
            current: index,
            attempt_count,
        });

        let outcome = ctx.probe.probe(host, ctx.settings.probe_timeout).await;
        let result = AttemptResult::from_outcome(index, outcome);

        if result.is_success() {
            success_count += 1;
            debug!(run = %ctx.handle, index, elapsed_ms = result.elapsed_millis, "Attempt succeeded");
        } else {
            failure_count += 1;
            warn!(
                run = %ctx.handle,
                index,
                detail = result.error_detail.as_deref().unwrap_or("no reply"),
                "Attempt failed"
            );
        }

        results.push(result.clone());
        ctx.observer.on_event(RunEvent::AttemptCompleted { result });

        if index == attempt_count {
            break;
        }

        tokio::select! {
            biased;

            _ = ctx.cancel.cancelled() => {
                debug!(run = %ctx.handle, index, "Cancelled during pause");
                cancelled = true;
                break;
            }
            _ = tokio::time::sleep(ctx.settings.pause) => {}
        }
    }

    let summary = RunSummary::new(success_count, failure_count, attempt_count);
    info!(
        run = %ctx.handle,
        %host,
        success = summary.success_count,
        failure = summary.failure_count,
        cancelled,
        "Probe run finished"
    );
    ctx.observer.on_event(RunEvent::Finished {
        summary,
        was_cancelled: cancelled,
    });

    RunReport {
        handle: ctx.handle,
        host: host.to_string(),
        summary,
        results,
        cancelled,
    }
}
