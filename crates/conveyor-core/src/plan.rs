//! Derived planning types: resolved jobs, the job graph, and the
//! event-specific pipeline plan.
//!
//! Everything here is produced fresh per load or per triggering event and
//! never stored; the plan is a pure function of (document, context).

use crate::condition::Expr;
use crate::pipeline::{ArtifactWhen, Disposition};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A rule with its condition parsed, ready for pure evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRule {
    pub when: Option<Expr>,
    pub disposition: Disposition,
}

/// Artifact policy with its expiry parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedArtifacts {
    pub paths: Vec<String>,
    pub when: ArtifactWhen,
    #[serde(with = "expiry_seconds")]
    pub expire_in: Option<Duration>,
}

impl ResolvedArtifacts {
    /// Whether a job outcome satisfies the retention filter.
    pub fn retains_on(&self, success: bool) -> bool {
        match self.when {
            ArtifactWhen::OnSuccess => success,
            ArtifactWhen::OnFailure => !success,
            ArtifactWhen::Always => true,
        }
    }
}

mod expiry_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        d.map(|d| d.num_seconds()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<i64>::deserialize(d)?.map(Duration::seconds))
    }
}

/// A job with its template merged in and all rules compiled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedJob {
    pub name: String,
    pub stage: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub before_script: Vec<String>,
    pub script: Vec<String>,
    pub variables: HashMap<String, String>,
    pub rules: Vec<CompiledRule>,
    pub allow_failure: bool,
    pub artifacts: Option<ResolvedArtifacts>,
    pub secrets: Vec<String>,
}

/// Jobs grouped into the globally declared stage order.
#[derive(Debug, Clone)]
pub struct JobGraph {
    pub stages: Vec<StageGroup>,
}

/// One declared stage with its jobs in declaration order. May be empty.
#[derive(Debug, Clone)]
pub struct StageGroup {
    pub name: String,
    pub jobs: Vec<ResolvedJob>,
}

impl JobGraph {
    pub fn job_count(&self) -> usize {
        self.stages.iter().map(|s| s.jobs.len()).sum()
    }
}

/// Why the workflow gate produced no pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum Suppression {
    /// A `when: never` workflow rule matched.
    NeverRule { rule_index: usize },
    /// No workflow rule matched; the gate is deny-by-default.
    NoMatchingRule,
}

/// Outcome of planning: either a concrete plan or a visible "no
/// pipeline" decision. Both are intentional results, not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanDecision {
    Run(PipelinePlan),
    Suppressed(Suppression),
}

/// The concrete ordered execution plan for one triggering event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelinePlan {
    pub pipeline: String,
    /// Stages in declared order; stages with zero included jobs are
    /// omitted entirely.
    pub stages: Vec<PlannedStage>,
    /// Jobs excluded by their rules, for reporting. Not failures.
    pub excluded: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedStage {
    pub name: String,
    pub jobs: Vec<PlannedJob>,
}

/// An included job, stripped of its (already evaluated) rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedJob {
    pub name: String,
    pub stage: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub before_script: Vec<String>,
    pub script: Vec<String>,
    pub variables: HashMap<String, String>,
    pub allow_failure: bool,
    pub artifacts: Option<ResolvedArtifacts>,
    pub secrets: Vec<String>,
}

impl From<&ResolvedJob> for PlannedJob {
    fn from(job: &ResolvedJob) -> Self {
        Self {
            name: job.name.clone(),
            stage: job.stage.clone(),
            image: job.image.clone(),
            tags: job.tags.clone(),
            before_script: job.before_script.clone(),
            script: job.script.clone(),
            variables: job.variables.clone(),
            allow_failure: job.allow_failure,
            artifacts: job.artifacts.clone(),
            secrets: job.secrets.clone(),
        }
    }
}

impl PipelinePlan {
    pub fn job_count(&self) -> usize {
        self.stages.iter().map(|s| s.jobs.len()).sum()
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.stages
            .iter()
            .flat_map(|s| s.jobs.iter().map(|j| j.name.as_str()))
            .collect()
    }
}
