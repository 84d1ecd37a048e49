//! Execution outcomes and the per-run report.

use crate::ids::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failure,
    /// Excluded by rules at planning time; never a failure.
    Skipped,
    /// Never started because an earlier stage failed.
    NotRun,
}

impl JobStatus {
    /// Whether this status blocks later stages (best-effort jobs are
    /// accounted separately by the orchestrator).
    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Failure)
    }

    pub fn ran(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure)
    }
}

/// Per-job execution outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub status: JobStatus,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Marks a failure that did not block later stages.
    #[serde(default)]
    pub allowed_failure: bool,
    /// Paths handed to the artifact store for this job.
    #[serde(default)]
    pub artifacts: Vec<String>,
}

impl JobOutcome {
    pub fn skipped() -> Self {
        Self {
            status: JobStatus::Skipped,
            exit_code: None,
            duration_ms: None,
            allowed_failure: false,
            artifacts: Vec::new(),
        }
    }

    pub fn not_run() -> Self {
        Self {
            status: JobStatus::NotRun,
            exit_code: None,
            duration_ms: None,
            allowed_failure: false,
            artifacts: Vec::new(),
        }
    }
}

/// Result of executing a pipeline plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub pipeline: String,
    pub success: bool,
    /// Outcome per job name, covering every planned job plus the
    /// rule-excluded ones (reported as skipped).
    pub outcomes: BTreeMap<String, JobOutcome>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_distinctions() {
        // not_run, skipped and failure are three distinct outcomes
        assert!(JobStatus::Failure.is_failure());
        assert!(!JobStatus::NotRun.is_failure());
        assert!(!JobStatus::Skipped.is_failure());
        assert!(!JobStatus::NotRun.ran());
        assert!(!JobStatus::Skipped.ran());
        assert!(JobStatus::Success.ran());
    }
}
