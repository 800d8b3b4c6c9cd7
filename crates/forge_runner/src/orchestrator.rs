//! Build orchestration: install, top up build-time dependencies, build,
//! then locate the output directory.
//!
//! Every step is bounded by a timeout. A non-zero exit and a timeout are
//! the same kind of failure, and the first failed step ends the build.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use forge_project::PackageManifest;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::BuildConfig;
use crate::toolchain::{ExecutionResult, Invocation, Toolchain};

const LOCK_FILE: &str = "package-lock.json";
const MANIFEST_FILE: &str = "package.json";
const MODULES_DIR: &str = "node_modules";
const ROOT_DOCUMENT: &str = "index.html";

/// The build step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    Toolchain,
    Install,
    DevDependencies,
    Build,
    LocateOutput,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Toolchain => "toolchain detection",
            Self::Install => "dependency install",
            Self::DevDependencies => "build dependency install",
            Self::Build => "production build",
            Self::LocateOutput => "output lookup",
        };
        write!(f, "{}", name)
    }
}

/// A failed build, with whatever diagnostics the toolchain produced.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{stage} failed: {message}")]
pub struct BuildFailure {
    pub stage: BuildStage,
    pub message: String,
    pub exit_code: Option<i64>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
}

impl BuildFailure {
    fn new(stage: BuildStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            exit_code: None,
            timed_out: false,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    fn from_execution(stage: BuildStage, invocation: &Invocation, result: ExecutionResult) -> Self {
        let message = if result.timed_out {
            format!(
                "`{}` timed out after {} seconds",
                invocation, invocation.timeout_seconds
            )
        } else {
            format!("`{}` exited with code {}", invocation, result.exit_code)
        };
        Self {
            stage,
            message,
            exit_code: Some(result.exit_code),
            timed_out: result.timed_out,
            stdout: result.stdout,
            stderr: result.stderr,
        }
    }

    /// Captured output for display, stderr first.
    pub fn diagnostics(&self) -> String {
        match (self.stderr.trim(), self.stdout.trim()) {
            ("", "") => self.message.clone(),
            (err, "") => err.to_string(),
            ("", out) => out.to_string(),
            (err, out) => format!("{}\n{}", err, out),
        }
    }
}

/// One completed toolchain step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub stage: BuildStage,
    pub command: String,
    pub duration_ms: u64,
}

/// A successful build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildArtifact {
    /// Project directory the build ran in.
    pub project_dir: PathBuf,
    /// Located output directory.
    pub output_dir: PathBuf,
    pub steps: Vec<StepRecord>,
    pub duration_ms: u64,
}

impl BuildArtifact {
    /// Root document of the build output.
    pub fn root_document(&self) -> PathBuf {
        self.output_dir.join(ROOT_DOCUMENT)
    }
}

/// Drives a [`Toolchain`] through a full production build.
#[derive(Clone)]
pub struct BuildOrchestrator {
    toolchain: Arc<dyn Toolchain>,
    config: BuildConfig,
}

impl BuildOrchestrator {
    pub fn new(toolchain: Arc<dyn Toolchain>, config: BuildConfig) -> Self {
        Self { toolchain, config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the project in `project_dir`.
    pub async fn build(&self, project_dir: &Path) -> Result<BuildArtifact, BuildFailure> {
        let start = Instant::now();
        let mut steps = Vec::new();

        if !self.toolchain.is_available().await {
            return Err(BuildFailure::new(
                BuildStage::Toolchain,
                format!("{} is not available", self.toolchain.name()),
            ));
        }

        let install_args = if project_dir.join(LOCK_FILE).is_file() {
            vec!["ci".to_string()]
        } else {
            vec!["install".to_string()]
        };
        let install = Invocation::new(install_args, project_dir)
            .timeout(self.config.install_timeout_seconds)
            .stream(self.config.stream_logs);
        steps.push(self.run_step(BuildStage::Install, install).await?);

        if self.config.install_dev_dependencies {
            let missing = missing_dev_dependencies(project_dir);
            if !missing.is_empty() {
                info!("Installing {} missing build dependencies", missing.len());
                let mut args = vec!["install".to_string(), "-D".to_string()];
                args.extend(missing);
                let top_up = Invocation::new(args, project_dir)
                    .timeout(self.config.dev_install_timeout_seconds)
                    .stream(self.config.stream_logs);
                steps.push(self.run_step(BuildStage::DevDependencies, top_up).await?);
            }
        }

        let build = Invocation::new(["run", "build"], project_dir)
            .timeout(self.config.build_timeout_seconds)
            .stream(self.config.stream_logs);
        steps.push(self.run_step(BuildStage::Build, build).await?);

        let output_dir = self.locate_output(project_dir).ok_or_else(|| {
            BuildFailure::new(
                BuildStage::LocateOutput,
                format!(
                    "no build output found (looked for: {})",
                    self.config.output_dirs.join(", ")
                ),
            )
        })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Build succeeded in {}ms, output at {}",
            duration_ms,
            output_dir.display()
        );
        Ok(BuildArtifact {
            project_dir: project_dir.to_path_buf(),
            output_dir,
            steps,
            duration_ms,
        })
    }

    /// First conventional output directory that exists.
    pub fn locate_output(&self, project_dir: &Path) -> Option<PathBuf> {
        self.config
            .output_dirs
            .iter()
            .map(|name| project_dir.join(name))
            .find(|dir| dir.is_dir())
    }

    async fn run_step(
        &self,
        stage: BuildStage,
        invocation: Invocation,
    ) -> Result<StepRecord, BuildFailure> {
        info!("Running {}: {} {}", stage, self.toolchain.name(), invocation);
        let result = self
            .toolchain
            .run(&invocation)
            .await
            .map_err(|e| BuildFailure::new(stage, e.to_string()))?;

        if !result.success() {
            warn!(
                "{} failed (exit {}, timed out: {})",
                stage, result.exit_code, result.timed_out
            );
            return Err(BuildFailure::from_execution(stage, &invocation, result));
        }

        debug!("{} finished in {}ms", stage, result.duration_ms);
        Ok(StepRecord {
            stage,
            command: invocation.command_line(),
            duration_ms: result.duration_ms,
        })
    }
}

/// `name@version` specs for declared devDependencies absent from `node_modules`.
pub fn missing_dev_dependencies(project_dir: &Path) -> Vec<String> {
    let Ok(raw) = std::fs::read_to_string(project_dir.join(MANIFEST_FILE)) else {
        return Vec::new();
    };
    let manifest = match PackageManifest::parse(&raw) {
        Ok(m) => m,
        Err(e) => {
            warn!("Cannot read build dependencies from manifest: {}", e);
            return Vec::new();
        }
    };

    let modules = project_dir.join(MODULES_DIR);
    manifest
        .dev_dependencies
        .iter()
        .filter(|(name, _)| !modules.join(name.as_str()).exists())
        .map(|(name, version)| format!("{}@{}", name, version))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockResponse, MockToolchain};
    use std::fs;
    use tempfile::tempdir;

    fn project(dir: &Path, dev_deps: &[(&str, &str)]) {
        let mut manifest = PackageManifest::canonical_default();
        manifest.dev_dependencies = dev_deps
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        fs::write(dir.join(MANIFEST_FILE), manifest.to_json_pretty()).unwrap();
    }

    fn orchestrator(mock: &MockToolchain) -> BuildOrchestrator {
        BuildOrchestrator::new(Arc::new(mock.clone()), BuildConfig::default())
    }

    #[test]
    fn test_missing_dev_dependencies() {
        let dir = tempdir().unwrap();
        project(dir.path(), &[("vite", "^5.0.8"), ("tailwindcss", "^3.4.7")]);
        fs::create_dir_all(dir.path().join("node_modules/vite")).unwrap();

        assert_eq!(missing_dev_dependencies(dir.path()), vec!["tailwindcss@^3.4.7"]);
    }

    #[test]
    fn test_scoped_dev_dependency_present() {
        let dir = tempdir().unwrap();
        project(dir.path(), &[("@vitejs/plugin-react", "^4.2.1")]);
        fs::create_dir_all(dir.path().join("node_modules/@vitejs/plugin-react")).unwrap();
        assert!(missing_dev_dependencies(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_successful_build() {
        let dir = tempdir().unwrap();
        project(dir.path(), &[]);
        let mock = MockToolchain::new().with_dist_output();

        let artifact = orchestrator(&mock).build(dir.path()).await.unwrap();
        assert_eq!(artifact.output_dir, dir.path().join("dist"));
        assert!(artifact.root_document().is_file());
        assert_eq!(mock.command_lines(), vec!["install", "run build"]);
    }

    #[tokio::test]
    async fn test_lockfile_uses_ci() {
        let dir = tempdir().unwrap();
        project(dir.path(), &[]);
        fs::write(dir.path().join(LOCK_FILE), "{}").unwrap();
        let mock = MockToolchain::new().with_dist_output();

        orchestrator(&mock).build(dir.path()).await.unwrap();
        assert_eq!(mock.command_lines()[0], "ci");
    }

    #[tokio::test]
    async fn test_dev_dependencies_topped_up() {
        let dir = tempdir().unwrap();
        project(dir.path(), &[("vite-plugin-pwa", "^0.20.5")]);
        let mock = MockToolchain::new().with_dist_output();

        orchestrator(&mock).build(dir.path()).await.unwrap();
        assert_eq!(
            mock.command_lines(),
            vec!["install", "install -D vite-plugin-pwa@^0.20.5", "run build"]
        );
    }

    #[tokio::test]
    async fn test_install_failure_stops_build() {
        let dir = tempdir().unwrap();
        project(dir.path(), &[]);
        let mock = MockToolchain::new()
            .respond_to("install", MockResponse::failure(1, "npm ERR! ERESOLVE"))
            .with_dist_output();

        let failure = orchestrator(&mock).build(dir.path()).await.unwrap_err();
        assert_eq!(failure.stage, BuildStage::Install);
        assert_eq!(failure.exit_code, Some(1));
        assert!(failure.diagnostics().contains("ERESOLVE"));
        assert!(!mock.was_called("run build"));
    }

    #[tokio::test]
    async fn test_dev_dependency_failure_is_distinct() {
        let dir = tempdir().unwrap();
        project(dir.path(), &[("tailwindcss", "^3.4.7")]);
        let mock = MockToolchain::new()
            .respond_to("install -D", MockResponse::failure(1, "404"))
            .with_dist_output();

        let failure = orchestrator(&mock).build(dir.path()).await.unwrap_err();
        assert_eq!(failure.stage, BuildStage::DevDependencies);
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let dir = tempdir().unwrap();
        project(dir.path(), &[]);
        let mock = MockToolchain::new().respond_to("run build", MockResponse::timeout());

        let failure = orchestrator(&mock).build(dir.path()).await.unwrap_err();
        assert_eq!(failure.stage, BuildStage::Build);
        assert!(failure.timed_out);
        assert!(failure.message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_output_dir() {
        let dir = tempdir().unwrap();
        project(dir.path(), &[]);
        let mock = MockToolchain::new();

        let failure = orchestrator(&mock).build(dir.path()).await.unwrap_err();
        assert_eq!(failure.stage, BuildStage::LocateOutput);
    }

    #[tokio::test]
    async fn test_unavailable_toolchain() {
        let dir = tempdir().unwrap();
        let mock = MockToolchain::new().set_available(false);

        let failure = orchestrator(&mock).build(dir.path()).await.unwrap_err();
        assert_eq!(failure.stage, BuildStage::Toolchain);
        assert_eq!(mock.call_count(), 0);
    }
}
