//! The build-and-preview pipeline and its degradation chain.
//!
//! States are tried strictly in order: served build, inlined document,
//! descriptive fallback. Anything unexpected becomes an error preview.
//! Expected degradation is a returned value, never an error.

use std::sync::Arc;

use forge_project::{FileMap, PreparedProject};
use forge_runner::{BuildArtifact, BuildOrchestrator, Toolchain};
use tracing::{error, info, warn};

use crate::config::PreviewConfig;
use crate::context::PreviewContext;
use crate::error::PreviewResult;
use crate::inline::Inliner;
use crate::outcome::PreviewOutcome;
use crate::server;

/// Directory inside a workspace that holds the project.
pub const PROJECT_DIR: &str = "app";

/// Runs one build attempt and picks the best available preview.
pub struct PreviewPipeline {
    context: Arc<PreviewContext>,
    config: PreviewConfig,
    orchestrator: BuildOrchestrator,
}

impl PreviewPipeline {
    pub fn new(
        context: Arc<PreviewContext>,
        config: PreviewConfig,
        toolchain: Arc<dyn Toolchain>,
    ) -> Self {
        let orchestrator = BuildOrchestrator::new(toolchain, config.build.clone());
        Self {
            context,
            config,
            orchestrator,
        }
    }

    pub fn context(&self) -> &Arc<PreviewContext> {
        &self.context
    }

    /// Build `files` and return a renderable preview. Never fails.
    pub async fn create_build_preview(&self, files: &FileMap) -> PreviewOutcome {
        match self.run(files).await {
            Ok(outcome) => {
                info!(
                    "Preview ready: {} (success: {})",
                    outcome.state_name(),
                    outcome.success()
                );
                outcome
            }
            Err(e) => {
                error!("Preview failed: {}", e);
                PreviewOutcome::error(format!("Preview error: {}", e))
            }
        }
    }

    async fn run(&self, files: &FileMap) -> PreviewResult<PreviewOutcome> {
        self.context.prepare_clean_workspace().await?;
        let workspace = self.context.create_workspace()?;
        let project_dir = workspace.join(PROJECT_DIR);

        let project = PreparedProject::prepare(files);
        let resolved = project.materialize(&project_dir)?;
        info!(
            "Materialized {} files into {} ({} stand-ins)",
            project.files.len(),
            project_dir.display(),
            resolved.created.len()
        );

        let artifact = match self.orchestrator.build(&project_dir).await {
            Ok(artifact) => artifact,
            Err(failure) => {
                warn!("Build failed, using descriptive preview: {}", failure);
                return Ok(PreviewOutcome::descriptive(
                    project.supplied.paths(),
                    failure.to_string(),
                    failure.diagnostics(),
                ));
            }
        };

        self.serve_or_inline(&artifact, workspace).await
    }

    async fn serve_or_inline(
        &self,
        artifact: &BuildArtifact,
        workspace: std::path::PathBuf,
    ) -> PreviewResult<PreviewOutcome> {
        match server::start(&artifact.output_dir, workspace.clone(), &self.config).await {
            Ok(running) => {
                let url = running.url.clone();
                self.context.register(running);
                return Ok(PreviewOutcome::Served { url, workspace });
            }
            Err(e) => warn!("Preview server unavailable, inlining instead: {}", e),
        }

        let document = Inliner::new().inline(&artifact.output_dir)?;
        Ok(PreviewOutcome::Inlined { document })
    }
}
