//! Template resolution: merging `extends` bundles into concrete jobs.

use conveyor_core::condition::Expr;
use conveyor_core::duration::parse_expire_in;
use conveyor_core::pipeline::{ArtifactPolicy, JobConfig, JobTemplate, RuleConfig};
use conveyor_core::plan::{CompiledRule, ResolvedArtifacts, ResolvedJob};
use conveyor_core::{Error, Result};
use std::collections::HashMap;

/// Resolves raw job definitions against the template registry.
///
/// Composition is single-level: a job extends at most one template and
/// templates cannot extend anything, so cycles are structurally
/// impossible. Template fields apply first; any attribute the job sets
/// overrides the template's wholesale (shallow, per attribute).
pub struct TemplateResolver;

impl TemplateResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve one job, parsing its rules and artifact expiry along the
    /// way so every definition error surfaces before a pipeline runs.
    pub fn resolve(
        &self,
        job: &JobConfig,
        templates: &HashMap<String, JobTemplate>,
    ) -> Result<ResolvedJob> {
        let template = match &job.extends {
            Some(name) => Some(
                templates
                    .get(name)
                    .ok_or_else(|| Error::UnknownTemplate(name.clone()))?,
            ),
            None => None,
        };

        let pick = |own: &Option<Vec<String>>, inherited: fn(&JobTemplate) -> &Option<Vec<String>>| {
            own.clone()
                .or_else(|| template.and_then(|t| inherited(t).clone()))
                .unwrap_or_default()
        };

        Ok(ResolvedJob {
            name: job.name.clone(),
            stage: job.stage.clone(),
            image: job
                .image
                .clone()
                .or_else(|| template.and_then(|t| t.image.clone())),
            tags: pick(&job.tags, |t| &t.tags),
            before_script: pick(&job.before_script, |t| &t.before_script),
            script: job.script.clone(),
            variables: job
                .variables
                .clone()
                .or_else(|| template.and_then(|t| t.variables.clone()))
                .unwrap_or_default(),
            rules: compile_rules(&job.rules)?,
            allow_failure: job.allow_failure,
            artifacts: job.artifacts.as_ref().map(resolve_artifacts).transpose()?,
            secrets: job.secrets.clone(),
        })
    }
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a rule list's conditions. Used for job rules and the workflow
/// gate alike.
pub fn compile_rules(rules: &[RuleConfig]) -> Result<Vec<CompiledRule>> {
    rules
        .iter()
        .map(|rule| {
            Ok(CompiledRule {
                when: rule.if_expr.as_deref().map(Expr::parse).transpose()?,
                disposition: rule.disposition,
            })
        })
        .collect()
}

fn resolve_artifacts(policy: &ArtifactPolicy) -> Result<ResolvedArtifacts> {
    Ok(ResolvedArtifacts {
        paths: policy.paths.clone(),
        when: policy.when,
        expire_in: policy.expire_in.as_deref().map(parse_expire_in).transpose()?,
    })
}
