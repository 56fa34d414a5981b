//! Probe scheduler: runs a bounded, cancellable sequence of probes against one
//! host and reports each attempt to an observer as it completes.
//!
//! At most one run is live per [`ProbeScheduler`]. Starting a new run cancels
//! the previous one and waits until its `Finished` event has been delivered,
//! so events of different runs never interleave.

mod engine;
pub mod events;
pub mod history;
pub mod params;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{DEFAULT_PAUSE_MS, DEFAULT_TIMEOUT_MS};
use crate::probes::Probe;

pub use self::events::{RunEvent, RunObserver};
pub use self::history::{AttemptOutcome, AttemptResult, RunReport, RunSummary};
pub use self::params::{RunParameters, ValidationError, MAX_ATTEMPTS, MIN_ATTEMPTS};

/// Opaque token identifying one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RunHandle(Uuid);

impl RunHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of the scheduler's current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Timing of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// Deadline handed to every probe.
    pub probe_timeout: Duration,
    /// Pause between consecutive attempts.
    pub pause: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            pause: Duration::from_millis(DEFAULT_PAUSE_MS),
        }
    }
}

type ReportSlot = Option<Arc<RunReport>>;

struct ActiveRun {
    handle: RunHandle,
    cancel: CancellationToken,
    done: watch::Receiver<ReportSlot>,
    task: JoinHandle<()>,
}

struct Slot {
    state: RunState,
    active: Option<ActiveRun>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives probe runs on a background task.
///
/// Dropping the scheduler cancels and aborts any live run. The aborted run
/// emits no `Finished` event and its report is lost; call
/// [`ProbeScheduler::shutdown`] first when the observer needs the summary.
pub struct ProbeScheduler {
    probe: Arc<dyn Probe>,
    settings: RunSettings,
    slot: Arc<Mutex<Slot>>,
    start_gate: tokio::sync::Mutex<()>,
}

impl ProbeScheduler {
    pub fn new(probe: Arc<dyn Probe>, settings: RunSettings) -> Self {
        Self {
            probe,
            settings,
            slot: Arc::new(Mutex::new(Slot {
                state: RunState::Idle,
                active: None,
            })),
            start_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn settings(&self) -> RunSettings {
        self.settings
    }

    pub fn state(&self) -> RunState {
        lock(&self.slot).state
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Handle of the live run, if any.
    pub fn current(&self) -> Option<RunHandle> {
        let slot = lock(&self.slot);
        match (&slot.active, slot.state) {
            (Some(active), RunState::Running) => Some(active.handle),
            _ => None,
        }
    }

    /// Validate raw input and start a run.
    ///
    /// On invalid input the observer receives `ValidationFailed` and the
    /// scheduler state is left untouched.
    pub async fn start<O: RunObserver>(
        &self,
        host: &str,
        attempts: &str,
        observer: O,
    ) -> Result<RunHandle, ValidationError> {
        match RunParameters::parse(host, attempts) {
            Ok(params) => Ok(self.start_run(params, Arc::new(observer)).await),
            Err(e) => {
                debug!(%host, %attempts, error = %e, "Rejected run parameters");
                observer.on_event(RunEvent::ValidationFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Start a run with validated parameters.
    ///
    /// Returns as soon as the run's task is spawned. A live run is cancelled
    /// first and its `Finished` event delivered before this run's first event.
    pub async fn start_run(
        &self,
        params: RunParameters,
        observer: Arc<dyn RunObserver>,
    ) -> RunHandle {
        let _gate = self.start_gate.lock().await;

        let previous = lock(&self.slot).active.take();
        if let Some(previous) = previous {
            previous.cancel.cancel();
            let mut done = previous.done;
            if done.wait_for(|report| report.is_some()).await.is_err() {
                debug!(run = %previous.handle, "Previous run ended without a report");
            }
            info!(run = %previous.handle, "Previous run torn down");
        }

        let handle = RunHandle::new();
        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(None);

        let ctx = engine::RunContext {
            handle,
            params,
            settings: self.settings,
            probe: Arc::clone(&self.probe),
            observer,
            cancel: cancel.clone(),
        };

        // Hold the slot while spawning so the task cannot finish before it is
        // registered as the active run.
        let mut slot = lock(&self.slot);
        let shared = Arc::clone(&self.slot);
        let task = tokio::spawn(async move {
            let report = engine::run_attempts(ctx).await;
            {
                let mut slot = lock(&shared);
                if slot.active.as_ref().is_some_and(|a| a.handle == handle) {
                    slot.state = if report.cancelled {
                        RunState::Cancelled
                    } else {
                        RunState::Completed
                    };
                }
            }
            done_tx.send_replace(Some(Arc::new(report)));
        });
        slot.state = RunState::Running;
        slot.active = Some(ActiveRun {
            handle,
            cancel,
            done: done_rx,
            task,
        });

        handle
    }

    /// Request cancellation of the run identified by `handle`.
    ///
    /// No-op when `handle` is stale or nothing is running. Returns without
    /// waiting for the loop to exit.
    pub fn stop(&self, handle: RunHandle) {
        let slot = lock(&self.slot);
        if slot.state != RunState::Running {
            return;
        }
        if let Some(active) = slot.active.as_ref().filter(|a| a.handle == handle) {
            if !active.cancel.is_cancelled() {
                info!(run = %handle, "Stop requested");
                active.cancel.cancel();
            }
        }
    }

    /// Wait for the run identified by `handle` to end and return its report.
    ///
    /// Returns `None` if `handle` is not the scheduler's most recent run.
    pub async fn wait(&self, handle: RunHandle) -> Option<RunReport> {
        let mut done = {
            let slot = lock(&self.slot);
            let active = slot.active.as_ref().filter(|a| a.handle == handle)?;
            active.done.clone()
        };
        let report = done.wait_for(|report| report.is_some()).await.ok()?;
        report.as_deref().cloned()
    }

    /// Stop the run and wait until it has ended.
    pub async fn stop_and_wait(&self, handle: RunHandle) -> Option<RunReport> {
        self.stop(handle);
        self.wait(handle).await
    }

    /// Stop whatever is running and wait for it to end.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.current() {
            self.stop_and_wait(handle).await;
        }
    }
}

/// Aborts the live run without a `Finished` event. Use `shutdown` for a
/// graceful stop.
impl Drop for ProbeScheduler {
    fn drop(&mut self) {
        let active = lock(&self.slot).active.take();
        if let Some(active) = active {
            debug!(run = %active.handle, "Scheduler dropped with a live run, aborting");
            active.cancel.cancel();
            active.task.abort();
        }
    }
}

impl std::fmt::Debug for ProbeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeScheduler")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
