//! reachprobe -- bounded, cancellable host reachability probing.
//!
//! This crate provides reachability probes (TCP connect, system ping), the
//! probe scheduler that runs a fixed number of attempts against one host while
//! streaming progress events, and the configuration used to wire them up.

pub mod config;
pub mod probes;
pub mod report;
pub mod scheduler;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::config::ReachConfig;
use crate::scheduler::{ProbeScheduler, RunEvent, RunReport};

/// Run one probe sequence to completion, handing every event to `on_event`.
///
/// Cancels the run when `stop` resolves. Returns `Ok(None)` when the
/// parameters are rejected; the `ValidationFailed` event has been delivered by
/// then.
pub async fn run_to_completion<S, F>(
    config: &ReachConfig,
    host: &str,
    attempts: &str,
    stop: S,
    mut on_event: F,
) -> Result<Option<RunReport>>
where
    S: std::future::Future<Output = ()>,
    F: FnMut(&RunEvent) -> Result<()>,
{
    config.validate()?;

    let probe = probes::build_probe(&config.probe);
    let scheduler = ProbeScheduler::new(probe, config.run_settings());
    tracing::info!(%host, method = %config.probe.method, "Starting probe run");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = match scheduler.start(host, attempts, tx).await {
        Ok(handle) => handle,
        Err(_) => {
            while let Some(event) = rx.recv().await {
                on_event(&event)?;
            }
            return Ok(None);
        }
    };

    tokio::pin!(stop);
    let mut stopping = false;
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    on_event(&event)?;
                    if matches!(event, RunEvent::Finished { .. }) {
                        break;
                    }
                }
                None => break,
            },
            _ = &mut stop, if !stopping => {
                stopping = true;
                scheduler.stop(handle);
            }
        }
    }

    Ok(scheduler.wait(handle).await)
}
