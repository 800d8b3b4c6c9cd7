//! Extract command - Parse generated text into a file map.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use forge_project::{extract_files, ProjectStats};

use super::InputArgs;

#[derive(Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Write the extracted files (as supplied, unhealed) to this directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ExtractReport {
    files: Vec<String>,
    stats: ProjectStats,
}

pub async fn execute(args: ExtractArgs) -> Result<()> {
    let raw = args.input.read()?;
    let files = extract_files(&raw);
    info!("Extracted {} files", files.len());

    if let Some(output) = &args.output {
        files
            .materialize(output)
            .with_context(|| format!("Failed to write files to {}", output.display()))?;
        info!("Wrote files to {}", output.display());
    }

    let report = ExtractReport {
        files: files.paths(),
        stats: ProjectStats::compute(&files),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.files.is_empty() {
        println!("No fenced files found.");
        return Ok(());
    }

    println!("Files ({}):", report.files.len());
    for path in &report.files {
        println!("   {}", path);
    }
    println!();
    println!("Statistics:");
    for (ext, count) in &report.stats.by_extension {
        let ext = if ext.is_empty() { "(none)" } else { ext.as_str() };
        println!("   .{:<10} {}", ext, count);
    }
    println!("   Total size:   {} bytes", report.stats.total_bytes);
    println!("   Average size: {} bytes", report.stats.average_bytes);
    println!("   Total lines:  {}", report.stats.total_lines);
    println!("   Complexity:   {}", report.stats.complexity);
    println!("   Structure:    {}", report.stats.structure_type);
    if !report.stats.frameworks_detected.is_empty() {
        let names: Vec<String> = report
            .stats
            .frameworks_detected
            .iter()
            .map(|f| f.to_string())
            .collect();
        println!("   Frameworks:   {}", names.join(", "));
    }

    Ok(())
}
