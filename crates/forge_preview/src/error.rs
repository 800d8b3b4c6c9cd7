//! Error types for the preview crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for preview operations.
pub type PreviewResult<T> = Result<T, PreviewError>;

/// Errors that can occur while preparing or serving a preview.
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error(
        "Insufficient disk space for dependency install: {available} bytes free, {required} required. Free some space and retry."
    )]
    InsufficientDiskSpace { available: u64, required: u64 },

    #[error("Failed to bind preview server on {addr}: {message}")]
    Bind { addr: String, message: String },

    #[error("Preview server at {url} not ready after {attempts} attempts")]
    NotReady { url: String, attempts: u32 },

    #[error("Build output has no root document: {0}")]
    MissingDocument(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Project error: {0}")]
    Project(#[from] forge_project::ProjectError),

    #[error("Runner error: {0}")]
    Runner(#[from] forge_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
