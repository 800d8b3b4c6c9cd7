//! Heal command - Normalize, heal and materialize a project without building.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use forge_project::{HealReport, NormalizeReport, PreparedProject, ResolveReport};

use super::InputArgs;

#[derive(Args)]
pub struct HealArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Directory to write the healed project into
    #[arg(short, long)]
    output: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct HealSummary<'a> {
    used_default: bool,
    files: usize,
    normalize: &'a NormalizeReport,
    heal: &'a HealReport,
    resolve: &'a ResolveReport,
}

pub async fn execute(args: HealArgs) -> Result<()> {
    let raw = args.input.read()?;
    let project = PreparedProject::from_raw(&raw);

    let resolve = project
        .materialize(&args.output)
        .with_context(|| format!("Failed to write project to {}", args.output.display()))?;
    info!(
        "Project written to {} ({} files)",
        args.output.display(),
        project.files.len()
    );

    if args.json {
        let summary = HealSummary {
            used_default: project.used_default,
            files: project.files.len(),
            normalize: &project.normalize,
            heal: &project.heal,
            resolve: &resolve,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if project.used_default {
        println!("No files found in input, wrote the default project.");
    }
    println!("Project: {}", args.output.display());

    let normalize = &project.normalize;
    for (from, to) in &normalize.remapped {
        println!("   remapped   {} -> {}", from, to);
    }
    for path in &normalize.dropped {
        println!("   dropped    {}", path);
    }
    for path in &normalize.synthesized {
        println!("   scaffolded {}", path);
    }

    let heal = &project.heal;
    if !heal.capabilities.is_empty() {
        let tags: Vec<String> = heal.capabilities.iter().map(|t| t.to_string()).collect();
        println!("   detected   {}", tags.join(", "));
    }
    for name in heal.added_dependencies.iter().chain(&heal.added_dev_dependencies) {
        println!("   added dep  {}", name);
    }

    for path in &resolve.created {
        println!("   stand-in   {}", path);
    }
    println!(
        "Resolved {} references across {} scripts",
        resolve.references, resolve.scanned
    );

    Ok(())
}
