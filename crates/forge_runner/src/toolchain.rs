//! Toolchain trait and execution types.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RunnerResult;

/// A single toolchain command to run in a project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Arguments passed to the toolchain executable.
    pub args: Vec<String>,
    /// Directory the command runs in.
    pub workdir: PathBuf,
    /// Timeout in seconds, 0 for none.
    pub timeout_seconds: u64,
    /// Forward output lines to the log while running.
    pub stream_logs: bool,
}

impl Invocation {
    pub fn new<I, S>(args: I, workdir: &Path) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            workdir: workdir.to_path_buf(),
            timeout_seconds: 0,
            stream_logs: false,
        }
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn stream(mut self, enabled: bool) -> Self {
        self.stream_logs = enabled;
        self
    }

    /// Space-joined arguments, for logs and matching.
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())
    }
}

/// Result of running one toolchain command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code, -1 when the process was killed or gave none.
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    /// The command was killed after exceeding its timeout.
    pub timed_out: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Exit code 0 within the time limit.
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// An external package-manager/build toolchain.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Executable name, for logs.
    fn name(&self) -> &str;

    /// Whether the toolchain can be invoked at all.
    async fn is_available(&self) -> bool;

    /// Run a command to completion or timeout.
    ///
    /// Non-zero exits and timeouts are reported in the result, not as errors.
    async fn run(&self, invocation: &Invocation) -> RunnerResult<ExecutionResult>;
}
