//! Per-attempt results and run summaries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::RunHandle;
use crate::probes::ProbeOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// Outcome of one attempt. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptResult {
    /// 1-based position in the run.
    pub index: u32,
    pub outcome: AttemptOutcome,
    /// Truncated milliseconds; zero unless the attempt succeeded.
    pub elapsed_millis: u64,
    /// Human-readable cause; only on failure.
    pub error_detail: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl AttemptResult {
    pub fn from_outcome(index: u32, outcome: ProbeOutcome) -> Self {
        let (outcome, elapsed_millis, error_detail) = match outcome {
            ProbeOutcome::Reachable { elapsed } => (
                AttemptOutcome::Success,
                u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                None,
            ),
            ProbeOutcome::Unreachable { failure } => (
                AttemptOutcome::Failure,
                0,
                failure.map(|f| f.to_string()),
            ),
        };

        Self {
            index,
            outcome,
            elapsed_millis,
            error_detail,
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

/// Final counts of a run.
///
/// `success_count + failure_count == total_attempts`, the number of attempts
/// actually run, which is below `requested_attempts` when stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub success_count: u32,
    pub failure_count: u32,
    pub total_attempts: u32,
    pub requested_attempts: u32,
}

impl RunSummary {
    pub fn new(success_count: u32, failure_count: u32, requested_attempts: u32) -> Self {
        Self {
            success_count,
            failure_count,
            total_attempts: success_count + failure_count,
            requested_attempts,
        }
    }

    /// Percentage of run attempts that succeeded, 0 when nothing ran.
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        f64::from(self.success_count) * 100.0 / f64::from(self.total_attempts)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub handle: RunHandle,
    pub host: String,
    pub summary: RunSummary,
    pub results: Vec<AttemptResult>,
    pub cancelled: bool,
}
