//! The execution orchestrator.

use chrono::Utc;
use conveyor_core::RunId;
use conveyor_core::outcome::{JobOutcome, JobStatus, RunReport};
use conveyor_core::plan::{PipelinePlan, PlannedJob};
use conveyor_core::ports::{ArtifactBundle, ArtifactStore, JobExecutor, SecretStore};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Orchestrator policy knobs.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Abort still-running same-stage siblings on the first
    /// non-best-effort failure. Off by default: started jobs are
    /// allowed to finish, there is no preemption.
    pub cancel_stage_on_failure: bool,
}

/// Processes a pipeline plan: stages strictly in order, jobs within a
/// stage as independent concurrent tasks with a join-barrier at stage
/// end. Once a stage has a non-best-effort failure, later stages are
/// never started and their jobs are recorded as not-run.
pub struct Orchestrator {
    executor: Arc<dyn JobExecutor>,
    secrets: Arc<dyn SecretStore>,
    artifacts: Arc<dyn ArtifactStore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        executor: Arc<dyn JobExecutor>,
        secrets: Arc<dyn SecretStore>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            executor,
            secrets,
            artifacts,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute a plan to completion and report every job's outcome.
    pub async fn execute(&self, plan: &PipelinePlan) -> RunReport {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let start = std::time::Instant::now();
        info!(run = %run_id, pipeline = %plan.pipeline, jobs = plan.job_count(), "Starting run");

        let mut outcomes: BTreeMap<String, JobOutcome> = plan
            .excluded
            .iter()
            .map(|name| (name.clone(), JobOutcome::skipped()))
            .collect();

        let mut pipeline_failed = false;

        for stage in &plan.stages {
            if pipeline_failed {
                for job in &stage.jobs {
                    outcomes.insert(job.name.clone(), JobOutcome::not_run());
                }
                continue;
            }

            debug!(stage = %stage.name, jobs = stage.jobs.len(), "Entering stage");
            let mut join_set = JoinSet::new();
            let mut task_names: HashMap<tokio::task::Id, String> = HashMap::new();
            for job in &stage.jobs {
                let executor = self.executor.clone();
                let secrets = self.secrets.clone();
                let artifacts = self.artifacts.clone();
                let job = job.clone();
                let name = job.name.clone();
                let handle = join_set.spawn(async move {
                    let outcome = run_single_job(executor, secrets, artifacts, &job).await;
                    (job.name, outcome)
                });
                task_names.insert(handle.id(), name);
            }

            // Join-barrier: the stage resolves only when every spawned
            // job has, unless the cancel policy aborts the rest.
            let mut stage_failed = false;
            while let Some(result) = join_set.join_next_with_id().await {
                match result {
                    Ok((_, (name, outcome))) => {
                        if outcome.status.is_failure() && !outcome.allowed_failure {
                            stage_failed = true;
                            if self.config.cancel_stage_on_failure {
                                join_set.abort_all();
                            }
                        }
                        outcomes.insert(name, outcome);
                    }
                    // Aborted siblings surface as cancellation errors and
                    // are recorded as not-run below.
                    Err(err) if err.is_cancelled() => {}
                    // A panicked task is that job's failure, not a silent
                    // gap in the report.
                    Err(err) => {
                        stage_failed = true;
                        if self.config.cancel_stage_on_failure {
                            join_set.abort_all();
                        }
                        if let Some(name) = task_names.get(&err.id()) {
                            warn!(job = %name, error = %err, "Job task aborted abnormally");
                            outcomes.insert(
                                name.clone(),
                                JobOutcome {
                                    status: JobStatus::Failure,
                                    exit_code: None,
                                    duration_ms: None,
                                    allowed_failure: false,
                                    artifacts: Vec::new(),
                                },
                            );
                        }
                    }
                }
            }
            for job in &stage.jobs {
                outcomes
                    .entry(job.name.clone())
                    .or_insert_with(JobOutcome::not_run);
            }

            if stage_failed {
                warn!(stage = %stage.name, "Stage failed; later stages will not start");
                pipeline_failed = true;
            }
        }

        let completed_at = Utc::now();
        let report = RunReport {
            run_id,
            pipeline: plan.pipeline.clone(),
            success: !pipeline_failed,
            outcomes,
            started_at,
            completed_at,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(run = %run_id, success = report.success, "Run finished");
        report
    }
}

/// Run one job end to end: bind secrets, invoke the opaque action,
/// hand retained artifacts to the store. Failures of any of those are
/// this job's failure and never touch sibling jobs.
async fn run_single_job(
    executor: Arc<dyn JobExecutor>,
    secrets: Arc<dyn SecretStore>,
    artifacts: Arc<dyn ArtifactStore>,
    job: &PlannedJob,
) -> JobOutcome {
    let start = std::time::Instant::now();
    let mut outcome = JobOutcome {
        status: JobStatus::Failure,
        exit_code: None,
        duration_ms: None,
        allowed_failure: false,
        artifacts: Vec::new(),
    };

    // Fresh environment per invocation; secret bindings are never
    // shared between jobs.
    let mut env: HashMap<String, String> = job.variables.clone();
    for name in &job.secrets {
        match secrets.get(name).await {
            Ok(value) => {
                env.insert(name.clone(), value.expose().to_string());
            }
            Err(err) => {
                warn!(job = %job.name, secret = %name, error = %err, "Secret resolution failed");
                outcome.allowed_failure = job.allow_failure;
                outcome.duration_ms = Some(start.elapsed().as_millis() as u64);
                return outcome;
            }
        }
    }

    match executor.run_job(job, &env).await {
        Ok(result) => {
            outcome.exit_code = Some(result.exit_code);
            outcome.status = if result.is_success() {
                JobStatus::Success
            } else {
                JobStatus::Failure
            };
        }
        Err(err) => {
            warn!(job = %job.name, error = %err, "Executor error");
        }
    }

    let success = outcome.status == JobStatus::Success;
    if let Some(policy) = &job.artifacts
        && policy.retains_on(success)
    {
        let bundle = ArtifactBundle {
            paths: policy.paths.clone(),
            expires_at: policy.expire_in.map(|d| Utc::now() + d),
        };
        match artifacts.store(&job.name, &bundle).await {
            Ok(()) => outcome.artifacts = bundle.paths,
            Err(err) => {
                warn!(job = %job.name, error = %err, "Artifact storage failed");
                outcome.status = JobStatus::Failure;
            }
        }
    }

    outcome.allowed_failure = outcome.status.is_failure() && job.allow_failure;
    outcome.duration_ms = Some(start.elapsed().as_millis() as u64);
    debug!(job = %job.name, status = ?outcome.status, "Job finished");
    outcome
}
