//! CLI command handlers.

use crate::commands::EventArgs;
use console::style;
use conveyor_core::context::{EventContext, TriggerSource};
use conveyor_core::outcome::{JobStatus, RunReport};
use conveyor_core::pipeline::PipelineConfig;
use conveyor_core::plan::{PipelinePlan, PlanDecision, Suppression};
use conveyor_planner::{CompiledPipeline, Planner, compile};
use conveyor_runner::{EnvSecretStore, FsArtifactStore, Orchestrator, OrchestratorConfig, ShellExecutor};
use schemars::schema_for;
use std::sync::Arc;

type CliError = Box<dyn std::error::Error>;

fn load(path: &str) -> Result<CompiledPipeline, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path, e))?;
    let config: PipelineConfig = serde_yaml::from_str(&text)?;
    Ok(compile(&config)?)
}

fn event_context(event: &EventArgs) -> Result<EventContext, CliError> {
    let source: TriggerSource = event.source.parse()?;
    let mut ctx = EventContext::new(source).with_open_merge_requests(event.open_merge_requests);
    if let Some(branch) = &event.branch {
        ctx = ctx.with_branch(branch);
    }
    if let Some(branch) = &event.default_branch {
        ctx = ctx.with_default_branch(branch);
    }
    for pair in &event.variables {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("--var expects KEY=VALUE, got `{}`", pair))?;
        ctx = ctx.with_variable(key, value);
    }
    Ok(ctx)
}

pub fn validate(path: &str) -> Result<(), CliError> {
    let pipeline = load(path)?;
    println!(
        "{} {} is valid: {} stages, {} jobs",
        style("✓").green().bold(),
        path,
        pipeline.graph.stages.len(),
        pipeline.graph.job_count()
    );
    Ok(())
}

pub fn plan(path: &str, event: &EventArgs, json: bool) -> Result<(), CliError> {
    let pipeline = load(path)?;
    let ctx = event_context(event)?;
    let decision = Planner::new().plan(&pipeline, &ctx);

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    match decision {
        PlanDecision::Suppressed(reason) => print_suppression(&reason),
        PlanDecision::Run(plan) => print_plan(&plan),
    }
    Ok(())
}

pub async fn run(
    path: &str,
    event: &EventArgs,
    workspace: &str,
    artifacts_dir: &str,
    cancel_stage_on_failure: bool,
    json: bool,
) -> Result<(), CliError> {
    let pipeline = load(path)?;
    let ctx = event_context(event)?;

    let plan = match Planner::new().plan(&pipeline, &ctx) {
        PlanDecision::Suppressed(reason) => {
            print_suppression(&reason);
            return Ok(());
        }
        PlanDecision::Run(plan) => plan,
    };

    let orchestrator = Orchestrator::new(
        Arc::new(ShellExecutor::new(workspace)),
        Arc::new(EnvSecretStore::new()),
        Arc::new(FsArtifactStore::new(workspace, artifacts_dir)),
    )
    .with_config(OrchestratorConfig {
        cancel_stage_on_failure,
    });

    let report = orchestrator.execute(&plan).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.success {
        Ok(())
    } else {
        Err("pipeline failed".into())
    }
}

pub fn schema() -> Result<(), CliError> {
    let schema = schema_for!(PipelineConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn print_suppression(reason: &Suppression) {
    // A suppressed pipeline is a deliberate outcome, not an error.
    let detail = match reason {
        Suppression::NeverRule { rule_index } => {
            format!("workflow rule #{} matched with `never`", rule_index)
        }
        Suppression::NoMatchingRule => "no workflow rule matched".to_string(),
    };
    println!("{} No pipeline: {}", style("∅").yellow().bold(), detail);
}

fn print_plan(plan: &PipelinePlan) {
    println!(
        "{} Pipeline {} would run {} jobs:",
        style("▶").cyan().bold(),
        style(&plan.pipeline).bold(),
        plan.job_count()
    );
    for stage in &plan.stages {
        println!("  {} {}", style("stage").dim(), style(&stage.name).bold());
        for job in &stage.jobs {
            let marker = if job.allow_failure {
                style("(best-effort)").dim().to_string()
            } else {
                String::new()
            };
            println!("    - {} {}", job.name, marker);
        }
    }
    for name in &plan.excluded {
        println!("  {} {} excluded by rules", style("⏭").dim(), name);
    }
}

fn print_report(report: &RunReport) {
    for (name, outcome) in &report.outcomes {
        let status = match outcome.status {
            JobStatus::Success => style("success").green(),
            JobStatus::Failure if outcome.allowed_failure => style("failure (allowed)").yellow(),
            JobStatus::Failure => style("failure").red(),
            JobStatus::Skipped => style("skipped").dim(),
            JobStatus::NotRun => style("not run").dim(),
        };
        println!("  {:<24} {}", name, status);
    }
    if report.success {
        println!(
            "{} Pipeline {} succeeded in {:.2}s",
            style("✓").green().bold(),
            report.pipeline,
            report.duration_ms as f64 / 1000.0
        );
    } else {
        println!(
            "{} Pipeline {} failed after {:.2}s",
            style("✗").red().bold(),
            report.pipeline,
            report.duration_ms as f64 / 1000.0
        );
    }
}
