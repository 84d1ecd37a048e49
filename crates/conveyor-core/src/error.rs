//! Error types for Conveyor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Definition errors: detected before anything runs, fatal to the pipeline
    #[error("Invalid condition `{expression}`: {message}")]
    InvalidCondition { expression: String, message: String },

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Job `{job}` references undeclared stage `{stage}`")]
    UnknownStage { job: String, stage: String },

    #[error("Duplicate job name: {0}")]
    DuplicateJob(String),

    #[error("Invalid artifact expiry `{0}`: {1}")]
    InvalidExpiry(String, String),

    #[error("Pipeline declares no stages")]
    EmptyPipeline,

    // Execution errors: reported per job, never corrupt sibling jobs
    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    #[error("Artifact storage failed: {0}")]
    ArtifactStorage(String),

    #[error("Executor error: {0}")]
    Executor(String),
}

pub type Result<T> = std::result::Result<T, Error>;
