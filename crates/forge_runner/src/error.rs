//! Error types for the runner crate.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors raised while driving an external toolchain.
///
/// A command that runs and exits non-zero is not an error at this level;
/// it comes back as an [`crate::ExecutionResult`] and the orchestrator turns
/// it into a [`crate::BuildFailure`].
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Toolchain not available: {0}")]
    ToolNotFound(String),

    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid project directory: {0}")]
    InvalidProject(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
