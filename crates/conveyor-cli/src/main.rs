//! Conveyor CLI entrypoint.

use clap::Parser;

mod commands;
mod handlers;

use commands::Commands;

#[derive(Parser)]
#[command(name = "conveyor")]
#[command(author, version, about = "Rule-driven pipeline planner and runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => handlers::validate(&path)?,
        Commands::Plan { path, event, json } => handlers::plan(&path, &event, json)?,
        Commands::Run {
            path,
            event,
            workspace,
            artifacts_dir,
            cancel_stage_on_failure,
            json,
        } => {
            handlers::run(
                &path,
                &event,
                &workspace,
                &artifacts_dir,
                cancel_stage_on_failure,
                json,
            )
            .await?
        }
        Commands::Schema => handlers::schema()?,
    }

    Ok(())
}
