//! npm CLI toolchain.
//!
//! Commands run as blocking child processes on the blocking thread pool,
//! with stdout/stderr drained by reader threads into shared buffers and a
//! polling wait that kills the child's whole process group once its timeout
//! expires. Output printed before the timeout is kept.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{RunnerError, RunnerResult};
use crate::toolchain::{ExecutionResult, Invocation, Toolchain};

#[cfg(windows)]
const NPM_CANDIDATES: &[&str] = &["npm.cmd", "npm"];
#[cfg(not(windows))]
const NPM_CANDIDATES: &[&str] = &["npm"];

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const READER_GRACE: Duration = Duration::from_millis(500);

/// Output stream of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Toolchain backed by the `npm` executable.
#[derive(Debug, Clone)]
pub struct NpmToolchain {
    program: String,
}

impl NpmToolchain {
    /// Probe the known executable names and use the first that answers.
    pub fn detect() -> RunnerResult<Self> {
        for candidate in NPM_CANDIDATES {
            if Self::probe(candidate) {
                info!("Using npm executable: {}", candidate);
                return Ok(Self::with_program(*candidate));
            }
        }
        Err(RunnerError::ToolNotFound(format!(
            "npm not found (tried: {})",
            NPM_CANDIDATES.join(", ")
        )))
    }

    /// Use a specific executable without probing.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn probe(program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Toolchain for NpmToolchain {
    fn name(&self) -> &str {
        &self.program
    }

    async fn is_available(&self) -> bool {
        let program = self.program.clone();
        tokio::task::spawn_blocking(move || Self::probe(&program))
            .await
            .unwrap_or(false)
    }

    async fn run(&self, invocation: &Invocation) -> RunnerResult<ExecutionResult> {
        let program = self.program.clone();
        let invocation = invocation.clone();
        tokio::task::spawn_blocking(move || execute_with_streaming(&program, &invocation))
            .await
            .map_err(|e| RunnerError::ExecutionFailed(format!("Execution task failed: {}", e)))?
    }
}

/// Run a command and capture its output, killing it on timeout.
pub fn execute_with_streaming(
    program: &str,
    invocation: &Invocation,
) -> RunnerResult<ExecutionResult> {
    if !invocation.workdir.is_dir() {
        return Err(RunnerError::InvalidProject(
            invocation.workdir.display().to_string(),
        ));
    }

    debug!(
        "Executing: {} {} (in {})",
        program,
        invocation,
        invocation.workdir.display()
    );

    let mut command = Command::new(program);
    command
        .args(&invocation.args)
        .current_dir(&invocation.workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so a timeout can take down npm and everything it spawned.
        command.process_group(0);
    }

    let mut child = command
        .spawn()
        .map_err(|e| RunnerError::ExecutionFailed(format!("Failed to spawn {}: {}", program, e)))?;

    let started_at = Utc::now();
    let start = Instant::now();

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RunnerError::ExecutionFailed("stdout not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| RunnerError::ExecutionFailed("stderr not captured".to_string()))?;

    let stdout_buffer = Arc::new(Mutex::new(String::new()));
    let stderr_buffer = Arc::new(Mutex::new(String::new()));
    let readers = [
        spawn_reader(stdout, LogStream::Stdout, invocation.stream_logs, stdout_buffer.clone()),
        spawn_reader(stderr, LogStream::Stderr, invocation.stream_logs, stderr_buffer.clone()),
    ];

    let timeout = Duration::from_secs(invocation.timeout_seconds);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if invocation.timeout_seconds > 0 && start.elapsed() > timeout {
                    warn!(
                        "{} {} timed out after {} seconds, killing",
                        program, invocation, invocation.timeout_seconds
                    );
                    kill_tree(&mut child);
                    let _ = child.wait();
                    break None;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                kill_tree(&mut child);
                return Err(RunnerError::ExecutionFailed(format!(
                    "Failed to wait for process: {}",
                    e
                )));
            }
        }
    };

    let finished_at = Utc::now();
    let duration_ms = start.elapsed().as_millis() as u64;

    match status {
        Some(_) => {
            for reader in readers {
                let _ = reader.join();
            }
        }
        None => {
            // A process that escaped the group may still hold a pipe open;
            // give the readers a bounded grace period instead of joining.
            let deadline = Instant::now() + READER_GRACE;
            while readers.iter().any(|r| !r.is_finished()) && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            for reader in readers {
                if reader.is_finished() {
                    let _ = reader.join();
                }
            }
        }
    }

    let stdout_output = stdout_buffer.lock().clone();
    let mut stderr_output = stderr_buffer.lock().clone();

    let Some(status) = status else {
        stderr_output.push_str(&format!(
            "{} {} timed out after {} seconds\n",
            program, invocation, invocation.timeout_seconds
        ));
        return Ok(ExecutionResult {
            exit_code: -1,
            stdout: stdout_output,
            stderr: stderr_output,
            timed_out: true,
            started_at,
            finished_at,
            duration_ms,
        });
    };

    Ok(ExecutionResult {
        exit_code: status.code().unwrap_or(-1) as i64,
        stdout: stdout_output,
        stderr: stderr_output,
        timed_out: false,
        started_at,
        finished_at,
        duration_ms,
    })
}

/// Kill the child and, on unix, every process in its group.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        match Command::new("kill")
            .args(["-KILL", "--", &group])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => debug!("Killed process group {}", child.id()),
            Ok(_) | Err(_) => warn!("Could not signal process group {}", child.id()),
        }
    }
    let _ = child.kill();
}

fn spawn_reader<R: Read + Send + 'static>(
    source: R,
    stream: LogStream,
    stream_logs: bool,
    buffer: Arc<Mutex<String>>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let reader = BufReader::new(source);
        for line in reader.lines().map_while(Result::ok) {
            if stream_logs {
                info!(target: "forge::npm", "[{}] {}", stream, line);
            }
            let mut output = buffer.lock();
            output.push_str(&line);
            output.push('\n');
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn test_captures_output_and_exit_code() {
        let dir = tempdir().unwrap();
        let inv = Invocation::new(["-c", "echo hello; echo oops >&2; exit 3"], dir.path());
        let result = execute_with_streaming("sh", &inv).unwrap();

        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.stderr, "oops\n");
        assert!(!result.success());
    }

    #[test]
    fn test_timeout_kills_process() {
        let dir = tempdir().unwrap();
        let inv = Invocation::new(["-c", "exec sleep 5"], dir.path()).timeout(1);
        let result = execute_with_streaming("sh", &inv).unwrap();

        assert!(result.timed_out);
        assert!(!result.success());
        assert!(result.duration_ms < 5000);
    }

    #[test]
    fn test_runs_in_workdir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let inv = Invocation::new(["-c", "ls"], dir.path());
        let result = execute_with_streaming("sh", &inv).unwrap();
        assert!(result.stdout.contains("marker.txt"));
    }

    #[test]
    fn test_missing_program_is_error() {
        let dir = tempdir().unwrap();
        let inv = Invocation::new(["install"], dir.path());
        assert!(execute_with_streaming("definitely-not-a-real-npm", &inv).is_err());
    }

    #[test]
    fn test_missing_workdir_is_error() {
        let inv = Invocation::new(["install"], Path::new("/nonexistent/forge/dir"));
        assert!(matches!(
            execute_with_streaming("sh", &inv),
            Err(RunnerError::InvalidProject(_))
        ));
    }
}
