//! Event-driven pipeline planning.
//!
//! The planner walks the workflow rule gate first (deny-by-default,
//! first match wins), then each job's own rules, and emits the concrete
//! ordered plan for the triggering event. Planning is pure: the same
//! compiled pipeline and context always yield the same plan.

use crate::graph::GraphBuilder;
use crate::resolve::{TemplateResolver, compile_rules};
use conveyor_core::Result;
use conveyor_core::context::EventContext;
use conveyor_core::pipeline::PipelineConfig;
use conveyor_core::plan::{
    CompiledRule, JobGraph, PipelinePlan, PlanDecision, PlannedStage, ResolvedJob, Suppression,
};
use tracing::{debug, info};

/// A pipeline document after definition-time compilation: templates
/// merged, conditions parsed, jobs grouped into declared stage order.
/// Immutable; constructed once at load time.
#[derive(Debug, Clone)]
pub struct CompiledPipeline {
    pub name: String,
    pub workflow_rules: Vec<CompiledRule>,
    pub graph: JobGraph,
}

/// Compile a document, surfacing every definition error (malformed
/// condition, unknown template or stage, duplicate job, bad expiry)
/// before any pipeline runs.
pub fn compile(config: &PipelineConfig) -> Result<CompiledPipeline> {
    let resolver = TemplateResolver::new();
    let jobs = config
        .jobs
        .iter()
        .map(|job| resolver.resolve(job, &config.templates))
        .collect::<Result<Vec<ResolvedJob>>>()?;

    let graph = GraphBuilder::new().build(jobs, &config.stages)?;
    let workflow_rules = compile_rules(&config.workflow.rules)?;

    debug!(
        pipeline = %config.name,
        stages = config.stages.len(),
        jobs = graph.job_count(),
        "Compiled pipeline definition"
    );

    Ok(CompiledPipeline {
        name: config.name.clone(),
        workflow_rules,
        graph,
    })
}

/// First-match-wins evaluation of a rule list. Returns the matched
/// rule's index and disposition, or `None` when the list is exhausted.
fn first_match<'a>(rules: &'a [CompiledRule], ctx: &EventContext) -> Option<(usize, &'a CompiledRule)> {
    rules.iter().enumerate().find(|(_, rule)| {
        rule.when.as_ref().map(|expr| expr.evaluate(ctx)).unwrap_or(true)
    })
}

/// Decides, per triggering event, what actually runs.
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    /// Produce the plan for one event, or a visible suppression.
    pub fn plan(&self, pipeline: &CompiledPipeline, ctx: &EventContext) -> PlanDecision {
        // Workflow gate: deny by default, an explicit catch-all rule is
        // required to run anything.
        match first_match(&pipeline.workflow_rules, ctx) {
            Some((index, rule)) if !rule.disposition.includes() => {
                info!(pipeline = %pipeline.name, rule = index, "Pipeline suppressed by workflow rule");
                return PlanDecision::Suppressed(Suppression::NeverRule { rule_index: index });
            }
            Some(_) => {}
            None => {
                info!(pipeline = %pipeline.name, "Pipeline suppressed: no workflow rule matched");
                return PlanDecision::Suppressed(Suppression::NoMatchingRule);
            }
        }

        let mut stages = Vec::new();
        let mut excluded = Vec::new();

        for group in &pipeline.graph.stages {
            let jobs: Vec<_> = group
                .jobs
                .iter()
                .filter(|job| {
                    if self.job_included(job, ctx) {
                        true
                    } else {
                        excluded.push(job.name.clone());
                        false
                    }
                })
                .map(Into::into)
                .collect();

            // A stage with nothing included contributes no plan entry.
            if !jobs.is_empty() {
                stages.push(PlannedStage {
                    name: group.name.clone(),
                    jobs,
                });
            }
        }

        let plan = PipelinePlan {
            pipeline: pipeline.name.clone(),
            stages,
            excluded,
        };
        info!(
            pipeline = %pipeline.name,
            jobs = plan.job_count(),
            excluded = plan.excluded.len(),
            "Planned pipeline"
        );
        PlanDecision::Run(plan)
    }

    /// Job inclusion under first-match-wins semantics. Unlike the
    /// workflow gate, an *empty* rule list includes unconditionally;
    /// an exhausted one excludes.
    fn job_included(&self, job: &ResolvedJob, ctx: &EventContext) -> bool {
        if job.rules.is_empty() {
            return true;
        }
        match first_match(&job.rules, ctx) {
            Some((_, rule)) => rule.disposition.includes(),
            None => false,
        }
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conveyor_core::context::TriggerSource;
    use pretty_assertions::assert_eq;

    fn compiled(yaml: &str) -> CompiledPipeline {
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        compile(&config).unwrap()
    }

    /// Workflow modeled on a push/merge-request gate: merge request
    /// events run, pushes with open merge requests are deduplicated,
    /// plain pushes run.
    fn gated_pipeline() -> CompiledPipeline {
        compiled(
            r#"
            name: demo
            stages: [check, build, release]
            workflow:
              rules:
                - if: $source == "merge_request_event"
                - if: $source == "push" && $open_merge_requests
                  when: never
                - if: $source == "push"
            jobs:
              - name: lint
                stage: check
                script: [run-lint]
              - name: build
                stage: build
                script: [run-build]
                rules:
                  - if: $source == "merge_request_event"
              - name: publish
                stage: release
                script: [run-publish]
                rules:
                  - if: $branch == $default_branch
            "#,
        )
    }

    fn plan_for(ctx: &EventContext) -> PlanDecision {
        Planner::new().plan(&gated_pipeline(), ctx)
    }

    #[test]
    fn test_merge_request_includes_unconditional_and_mr_jobs() {
        let ctx = EventContext::new(TriggerSource::MergeRequestEvent).with_branch("feature-x");
        let PlanDecision::Run(plan) = plan_for(&ctx) else {
            panic!("expected a plan");
        };
        assert_eq!(plan.job_names(), vec!["lint", "build"]);
        assert_eq!(plan.excluded, vec!["publish"]);
    }

    #[test]
    fn test_push_with_open_merge_requests_suppressed() {
        let ctx = EventContext::new(TriggerSource::Push)
            .with_branch("feature-x")
            .with_open_merge_requests(true);
        let decision = plan_for(&ctx);
        assert!(matches!(
            decision,
            PlanDecision::Suppressed(Suppression::NeverRule { rule_index: 1 })
        ));
    }

    #[test]
    fn test_no_matching_workflow_rule_suppresses() {
        let ctx = EventContext::new(TriggerSource::Schedule);
        assert!(matches!(
            plan_for(&ctx),
            PlanDecision::Suppressed(Suppression::NoMatchingRule)
        ));
    }

    #[test]
    fn test_empty_workflow_rules_suppress_everything() {
        let pipeline = compiled(
            "{name: p, stages: [s], jobs: [{name: j, stage: s, script: [x]}]}",
        );
        let ctx = EventContext::new(TriggerSource::Push).with_branch("main");
        assert!(matches!(
            Planner::new().plan(&pipeline, &ctx),
            PlanDecision::Suppressed(Suppression::NoMatchingRule)
        ));
    }

    #[test]
    fn test_default_branch_job_inclusion() {
        let ctx = EventContext::new(TriggerSource::Push)
            .with_branch("main")
            .with_default_branch("main");
        let PlanDecision::Run(plan) = plan_for(&ctx) else {
            panic!("expected a plan");
        };
        assert!(plan.job_names().contains(&"publish"));

        let ctx = EventContext::new(TriggerSource::Push)
            .with_branch("dev")
            .with_default_branch("main");
        let PlanDecision::Run(plan) = plan_for(&ctx) else {
            panic!("expected a plan");
        };
        assert!(!plan.job_names().contains(&"publish"));
        assert!(plan.excluded.contains(&"publish".to_string()));
    }

    #[test]
    fn test_empty_stage_omitted_from_plan() {
        let ctx = EventContext::new(TriggerSource::Push).with_branch("dev");
        let PlanDecision::Run(plan) = plan_for(&ctx) else {
            panic!("expected a plan");
        };
        // build stage excluded (mr-only job), release excluded (not default
        // branch): only `check` remains, a lone job running by itself.
        let stage_names: Vec<&str> = plan.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(stage_names, vec!["check"]);
    }

    #[test]
    fn test_all_jobs_excluded_is_a_plan_not_suppression() {
        let pipeline = compiled(
            r#"
            name: p
            stages: [s]
            workflow:
              rules: [{}]
            jobs:
              - name: j
                stage: s
                script: [x]
                rules:
                  - if: $source == "manual"
            "#,
        );
        let ctx = EventContext::new(TriggerSource::Push);
        let PlanDecision::Run(plan) = Planner::new().plan(&pipeline, &ctx) else {
            panic!("expected a plan");
        };
        assert_eq!(plan.job_count(), 0);
        assert_eq!(plan.excluded, vec!["j"]);
    }

    #[test]
    fn test_unconditional_workflow_rule_is_catch_all() {
        let pipeline = compiled(
            "{name: p, stages: [s], workflow: {rules: [{when: default_include}]}, \
             jobs: [{name: j, stage: s, script: [x]}]}",
        );
        let ctx = EventContext::new(TriggerSource::Manual);
        assert!(matches!(
            Planner::new().plan(&pipeline, &ctx),
            PlanDecision::Run(_)
        ));
    }

    #[test]
    fn test_first_match_wins_over_later_never() {
        let pipeline = compiled(
            r#"
            name: p
            stages: [s]
            workflow:
              rules:
                - if: $source == "push"
                - when: never
            jobs: [{name: j, stage: s, script: [x]}]
            "#,
        );
        let ctx = EventContext::new(TriggerSource::Push);
        assert!(matches!(
            Planner::new().plan(&pipeline, &ctx),
            PlanDecision::Run(_)
        ));
        let ctx = EventContext::new(TriggerSource::Manual);
        assert!(matches!(
            Planner::new().plan(&pipeline, &ctx),
            PlanDecision::Suppressed(Suppression::NeverRule { rule_index: 1 })
        ));
    }

    #[test]
    fn test_plan_is_idempotent() {
        let ctx = EventContext::new(TriggerSource::MergeRequestEvent).with_branch("feature-x");
        let pipeline = gated_pipeline();
        let planner = Planner::new();

        let (PlanDecision::Run(a), PlanDecision::Run(b)) =
            (planner.plan(&pipeline, &ctx), planner.plan(&pipeline, &ctx))
        else {
            panic!("expected plans");
        };
        assert_eq!(a.job_names(), b.job_names());
        assert_eq!(a.excluded, b.excluded);
        let stages = |p: &PipelinePlan| {
            p.stages.iter().map(|s| s.name.clone()).collect::<Vec<_>>()
        };
        assert_eq!(stages(&a), stages(&b));
    }

    #[test]
    fn test_stage_order_matches_declaration_regardless_of_job_order() {
        let pipeline = compiled(
            r#"
            name: p
            stages: [first, second]
            workflow:
              rules: [{}]
            jobs:
              - name: late
                stage: second
                script: [x]
              - name: early
                stage: first
                script: [x]
            "#,
        );
        let ctx = EventContext::new(TriggerSource::Push);
        let PlanDecision::Run(plan) = Planner::new().plan(&pipeline, &ctx) else {
            panic!("expected a plan");
        };
        let stage_names: Vec<&str> = plan.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(stage_names, vec!["first", "second"]);
    }
}
