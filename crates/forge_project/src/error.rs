//! Error types for project extraction and healing.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for project operations.
pub type ProjectResult<T> = Result<T, ProjectError>;

/// Errors that can occur while materializing or packaging a project.
///
/// Parsing and normalization never fail; they degrade to the best
/// achievable file map instead. Only filesystem and packaging steps
/// surface errors.
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Path escapes the workspace root: {0}")]
    PathEscape(String),

    #[error("Workspace directory does not exist: {0}")]
    MissingWorkspace(PathBuf),

    #[error("Archive creation failed: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
