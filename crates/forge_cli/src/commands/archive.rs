//! Archive command - Package extracted files as a zip download.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use forge_project::{extract_files, write_archive, PreparedProject};

use super::InputArgs;

#[derive(Args)]
pub struct ArchiveArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Destination zip file
    #[arg(short, long, default_value = "project.zip")]
    output: PathBuf,

    /// Archive the healed project instead of the files as supplied
    #[arg(long)]
    healed: bool,
}

pub async fn execute(args: ArchiveArgs) -> Result<()> {
    let raw = args.input.read()?;

    let files = if args.healed {
        PreparedProject::from_raw(&raw).files
    } else {
        extract_files(&raw)
    };
    if files.is_empty() {
        bail!("No files found in input, nothing to archive");
    }

    let size = write_archive(&files, &args.output)
        .with_context(|| format!("Failed to write archive {}", args.output.display()))?;
    println!("Wrote {} ({} files, {} bytes)", args.output.display(), files.len(), size);

    Ok(())
}
