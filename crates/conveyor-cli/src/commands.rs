//! CLI command definitions.

use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a pipeline document (templates, stages, rule syntax)
    Validate {
        /// Path to pipeline file
        #[arg(default_value = "conveyor.yaml")]
        path: String,
    },

    /// Show which jobs an event would run, without executing anything
    Plan {
        /// Path to pipeline file
        #[arg(default_value = "conveyor.yaml")]
        path: String,

        #[command(flatten)]
        event: EventArgs,

        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Plan and execute a pipeline for an event
    Run {
        /// Path to pipeline file
        #[arg(default_value = "conveyor.yaml")]
        path: String,

        #[command(flatten)]
        event: EventArgs,

        /// Workspace directory for job steps
        #[arg(short, long, default_value = ".")]
        workspace: String,

        /// Directory artifact bundles are copied into
        #[arg(long, default_value = ".conveyor/artifacts")]
        artifacts_dir: String,

        /// Abort same-stage siblings on the first hard failure
        #[arg(long)]
        cancel_stage_on_failure: bool,

        /// Emit the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the JSON Schema of the pipeline document format
    Schema,
}

/// Event context flags shared by `plan` and `run`.
#[derive(Args)]
pub struct EventArgs {
    /// Trigger source: push, merge_request_event, schedule or manual
    #[arg(short, long, default_value = "push")]
    pub source: String,

    /// Branch the event refers to
    #[arg(short, long)]
    pub branch: Option<String>,

    /// The repository's default branch
    #[arg(long)]
    pub default_branch: Option<String>,

    /// Open merge requests target the pushed branch
    #[arg(long)]
    pub open_merge_requests: bool,

    /// Extra variables visible to rule conditions (KEY=VALUE)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub variables: Vec<String>,
}
