//! Conveyor Runner
//!
//! Drives a pipeline plan to completion: stages strictly in order, jobs
//! within a stage as independent concurrent tasks, outcomes and
//! artifacts collected per job. Job bodies are opaque; they run behind
//! the [`conveyor_core::ports::JobExecutor`] port.

pub mod artifacts;
pub mod runner;
pub mod secrets;
pub mod shell;

pub use artifacts::FsArtifactStore;
pub use runner::{Orchestrator, OrchestratorConfig};
pub use secrets::EnvSecretStore;
pub use shell::ShellExecutor;
