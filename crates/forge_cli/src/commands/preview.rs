//! Preview command - Build the project and serve or inline the result.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};

use forge_preview::{
    ForgeConfig, PreviewContext, PreviewOutcome, PreviewPipeline, ShutdownGuard,
};
use forge_project::extract_files;
use forge_runner::{NpmToolchain, Toolchain};

use super::InputArgs;

#[derive(Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    input: InputArgs,

    /// TOML configuration file
    #[arg(short, long, default_value = "forge.toml")]
    config: PathBuf,

    /// Port for the preview server
    #[arg(short, long, env = "FORGE_PREVIEW_PORT")]
    pub port: Option<u16>,

    /// Shared root for preview workspaces
    #[arg(long, env = "FORGE_PREVIEW_ROOT")]
    root: Option<PathBuf>,

    /// npm executable to use instead of the detected one
    #[arg(long)]
    npm: Option<String>,

    /// Skip the dev-dependency top-up after install
    #[arg(long)]
    skip_dev_deps: bool,

    /// Stream toolchain output through the logger
    #[arg(long)]
    stream: bool,

    /// Print the rendered HTML fragment instead of a summary
    #[arg(long)]
    html: bool,

    /// Keep the preview server running until Ctrl-C
    #[arg(short, long)]
    pub wait: bool,
}

pub async fn execute(args: PreviewArgs) -> Result<()> {
    let raw = args.input.read()?;

    let mut config = ForgeConfig::load(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?
        .preview;
    if let Some(port) = args.port {
        config = config.port(port);
    }
    if let Some(root) = &args.root {
        config = config.preview_root(root);
    }
    let mut build = config.build.clone();
    if args.skip_dev_deps {
        build = build.skip_dev_dependencies();
    }
    if args.stream {
        build = build.stream();
    }
    config = config.build(build);

    let toolchain = match &args.npm {
        Some(program) => NpmToolchain::with_program(program.clone()),
        None => NpmToolchain::detect().unwrap_or_else(|e| {
            warn!("{}", e);
            NpmToolchain::with_program("npm")
        }),
    };
    info!("Using toolchain: {}", toolchain.name());

    let context = Arc::new(PreviewContext::from_config(&config));
    let _guard = ShutdownGuard::new(context.clone());
    let pipeline = PreviewPipeline::new(context.clone(), config, Arc::new(toolchain));

    let files = extract_files(&raw);
    let outcome = pipeline.create_build_preview(&files).await;

    if args.html {
        println!("{}", outcome.render());
    } else {
        print_summary(&outcome);
    }

    if !outcome.success() {
        bail!("Preview degraded to {} state", outcome.state_name());
    }

    if args.wait && matches!(outcome, PreviewOutcome::Served { .. }) {
        eprintln!("Serving preview, press Ctrl-C to stop");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        info!("Stopping preview servers");
        context.teardown_servers().await;
        context.shutdown();
    }

    Ok(())
}

fn print_summary(outcome: &PreviewOutcome) {
    match outcome {
        PreviewOutcome::Served { url, workspace } => {
            println!("Preview running at {}", url);
            println!("Workspace: {}", workspace.display());
        }
        PreviewOutcome::Inlined { document } => {
            println!(
                "Preview server unavailable, inlined {} assets into a self-contained document",
                document.inlined
            );
            for reference in &document.missing {
                println!("   missing {}", reference);
            }
        }
        PreviewOutcome::Descriptive {
            files,
            reason,
            diagnostics,
        } => {
            println!("Build not previewable: {}", reason);
            println!("Files ({}):", files.len());
            for path in files {
                println!("   {}", path);
            }
            if !diagnostics.is_empty() {
                println!();
                println!("{}", diagnostics);
            }
        }
        PreviewOutcome::ErrorPreview { message } => println!("{}", message),
    }
}
