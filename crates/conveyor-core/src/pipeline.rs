//! Pipeline definition types.
//!
//! These types represent the user-authored pipeline YAML document: the
//! global stage order, the workflow rule gate, reusable job templates,
//! and the job list. They are plain serde data; all validation and
//! composition happens in the planner at definition-load time.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PipelineConfig {
    pub name: String,
    /// Global ordered stage list. Every job's stage must appear here.
    pub stages: Vec<String>,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Named attribute bundles jobs may inherit via `extends`.
    #[serde(default)]
    pub templates: HashMap<String, JobTemplate>,
    pub jobs: Vec<JobConfig>,
}

/// Workflow-level gate: decides whether any pipeline runs at all.
///
/// The rule list is deny-by-default; with no matching rule (including an
/// empty list) the pipeline is suppressed, so a catch-all rule is
/// required to run anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One entry of an ordered first-match-wins rule list.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RuleConfig {
    /// Condition expression; a rule without one always matches.
    #[serde(rename = "if", default)]
    pub if_expr: Option<String>,
    #[serde(rename = "when", default)]
    pub disposition: Disposition,
}

/// What a matching rule decides for its pipeline or job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Include the entity. The default when `when` is omitted.
    #[default]
    Include,
    /// Exclude the entity; for the workflow gate, suppress the pipeline.
    Never,
    /// Include; marks the explicit catch-all the workflow gate requires.
    DefaultInclude,
}

impl Disposition {
    pub fn includes(&self) -> bool {
        !matches!(self, Disposition::Never)
    }
}

/// Reusable bundle of job attributes. Never executed directly, and
/// templates cannot extend other templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct JobTemplate {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub before_script: Option<Vec<String>>,
    #[serde(default)]
    pub variables: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobConfig {
    pub name: String,
    pub stage: String,
    /// Optional single-level template reference.
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Capability tags selecting where the job may run.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Setup steps, run before `script`.
    #[serde(default)]
    pub before_script: Option<Vec<String>>,
    /// Opaque execution steps; exit status is the sole outcome signal.
    #[serde(default)]
    pub script: Vec<String>,
    #[serde(default)]
    pub variables: Option<HashMap<String, String>>,
    /// Inclusion rules; an empty list means unconditional inclusion.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    /// Best-effort marker: a failure does not block later stages.
    #[serde(default)]
    pub allow_failure: bool,
    #[serde(default)]
    pub artifacts: Option<ArtifactPolicy>,
    /// Names of secrets bound read-only into the job environment.
    #[serde(default)]
    pub secrets: Vec<String>,
}

/// Which paths a job preserves, under what outcome, and for how long.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ArtifactPolicy {
    pub paths: Vec<String>,
    #[serde(default)]
    pub when: ArtifactWhen,
    /// Human-readable expiry such as "30 minutes" or "1 week"; parsed at
    /// definition load time. `None` means the store's default lifetime.
    #[serde(default)]
    pub expire_in: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactWhen {
    #[default]
    OnSuccess,
    OnFailure,
    Always,
}
