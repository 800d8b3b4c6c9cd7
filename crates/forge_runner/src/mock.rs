//! Mock toolchain for testing.
//!
//! Records every invocation and answers with scripted responses, so the
//! orchestrator and the preview chain can be exercised without Node.js.
//! A successful build can also drop artifact files into the project.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{RunnerError, RunnerResult};
use crate::toolchain::{ExecutionResult, Invocation, Toolchain};

/// Predefined response for one invocation.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            timed_out: false,
            duration_ms: 100,
        }
    }

    pub fn failure(exit_code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            timed_out: false,
            duration_ms: 100,
        }
    }

    pub fn timeout() -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: "timed out".to_string(),
            timed_out: true,
            duration_ms: 100,
        }
    }

    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }

    fn is_success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Mock toolchain for testing.
#[derive(Clone)]
pub struct MockToolchain {
    available: Arc<RwLock<bool>>,
    /// Responses keyed by command-line prefix; first match wins.
    rules: Arc<RwLock<Vec<(String, MockResponse)>>>,
    /// Fallback responses, handed out in order.
    responses: Arc<RwLock<Vec<MockResponse>>>,
    response_index: Arc<AtomicUsize>,
    captured: Arc<RwLock<Vec<Invocation>>>,
    /// Files written relative to the workdir after a successful `run build`.
    build_artifacts: Arc<RwLock<Vec<(PathBuf, String)>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockToolchain {
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            rules: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(Vec::new())),
            response_index: Arc::new(AtomicUsize::new(0)),
            captured: Arc::new(RwLock::new(Vec::new())),
            build_artifacts: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    /// Answer invocations whose command line starts with `prefix`.
    pub fn respond_to(self, prefix: impl Into<String>, response: MockResponse) -> Self {
        self.rules.write().push((prefix.into(), response));
        self
    }

    /// Add a fallback response for the next unmatched invocation.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Write a file into the project when `run build` succeeds.
    pub fn with_build_artifact(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.build_artifacts
            .write()
            .push((path.into(), content.into()));
        self
    }

    /// Shorthand for a minimal `dist/index.html` build output.
    pub fn with_dist_output(self) -> Self {
        self.with_build_artifact(
            "dist/index.html",
            "<!doctype html><html><head><script type=\"module\" src=\"/assets/index.js\"></script></head><body><div id=\"root\"></div></body></html>",
        )
        .with_build_artifact("dist/assets/index.js", "console.log('built');")
    }

    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    pub fn get_calls(&self) -> Vec<Invocation> {
        self.captured.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured.read().len()
    }

    /// Command lines of every invocation, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.captured
            .read()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    pub fn was_called(&self, prefix: &str) -> bool {
        self.captured
            .read()
            .iter()
            .any(|c| c.command_line().starts_with(prefix))
    }

    pub fn clear_calls(&self) {
        self.captured.write().clear();
    }

    fn next_response(&self, command_line: &str) -> MockResponse {
        if let Some((_, response)) = self
            .rules
            .read()
            .iter()
            .find(|(prefix, _)| command_line.starts_with(prefix.as_str()))
        {
            return response.clone();
        }

        let responses = self.responses.read();
        if responses.is_empty() {
            return MockResponse::success("");
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses
            .get(index % responses.len())
            .cloned()
            .unwrap_or_else(|| MockResponse::success(""))
    }

    fn write_artifacts(&self, invocation: &Invocation) -> RunnerResult<()> {
        for (path, content) in self.build_artifacts.read().iter() {
            let target = invocation.workdir.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(target, content)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Toolchain for MockToolchain {
    fn name(&self) -> &str {
        "mock-npm"
    }

    async fn is_available(&self) -> bool {
        *self.available.read()
    }

    async fn run(&self, invocation: &Invocation) -> RunnerResult<ExecutionResult> {
        self.captured.write().push(invocation.clone());

        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(msg));
        }

        let command_line = invocation.command_line();
        let response = self.next_response(&command_line);
        if response.is_success() && command_line.starts_with("run build") {
            self.write_artifacts(invocation)?;
        }

        let started_at = Utc::now();
        Ok(ExecutionResult {
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            timed_out: response.timed_out,
            started_at,
            finished_at: started_at,
            duration_ms: response.duration_ms,
        })
    }
}
