//! Port traits (hexagonal architecture).
//!
//! These traits define the boundary between the planning/orchestration
//! core and its external collaborators: the executor that runs opaque
//! job actions, the secret store, and the artifact store.

use crate::Result;
use crate::plan::PlannedJob;
use crate::secrets::SecretValue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Result of running one job's opaque action. A zero exit status is the
/// sole success signal.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub exit_code: i32,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes a job's setup and execution steps.
///
/// Timeout and retry semantics belong to implementations; the
/// orchestrator performs no retries of its own.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Run the job's steps with the given environment. Returns the exit
    /// status of the first failing step, or zero.
    async fn run_job(&self, job: &PlannedJob, env: &HashMap<String, String>) -> Result<JobResult>;
}

/// External secret store. Values are requested by name and bound
/// read-only into a single job invocation.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<SecretValue>;
}

/// Artifact paths handed to the store together with their retention.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub paths: Vec<String>,
    /// When the bundle becomes eligible for deletion by the store.
    /// `None` means the store's default lifetime applies.
    pub expires_at: Option<DateTime<Utc>>,
}

/// External artifact store. Expiry enforcement happens there, never in
/// the engine.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store(&self, job: &str, bundle: &ArtifactBundle) -> Result<()>;
}
