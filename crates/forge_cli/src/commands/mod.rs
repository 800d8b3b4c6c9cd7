//! CLI command definitions.
//!
//! Each subcommand maps to one stage of the generation pipeline, from raw
//! model output to a served preview.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

pub mod archive;
pub mod extract;
pub mod heal;
pub mod preview;

/// webforge - turn generated source text into a running web project
#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "webforge - turn generated source text into a running web project")]
#[command(long_about = r#"
webforge reads model output containing fenced, title-annotated code blocks,
turns it into a buildable React/Vite project, heals common defects and
previews the result.

COMMANDS:
  extract  → Parse fenced blocks and print project statistics
  heal     → Normalize, heal and write the project without building
  preview  → Build the project and serve (or inline) the result
  archive  → Package the extracted files as a zip archive

Input is read from a file argument, or from stdin when omitted.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Build or preview degraded
  4 - I/O error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse generated text into files and report statistics
    Extract(extract::ExtractArgs),

    /// Normalize and heal a project, then write it to disk
    Heal(heal::HealArgs),

    /// Build the project and start a preview
    Preview(preview::PreviewArgs),

    /// Export the extracted files as a zip archive
    Archive(archive::ArchiveArgs),
}

/// Read raw model output from `path`, or stdin when absent or `-`.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read input: {}", p.display())),
        _ => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read input from stdin")?;
            Ok(raw)
        }
    }
}

/// Shared positional input argument.
#[derive(clap::Args, Debug, Clone)]
pub struct InputArgs {
    /// File containing the generated text (stdin when omitted)
    pub input: Option<PathBuf>,
}

impl InputArgs {
    pub fn read(&self) -> Result<String> {
        read_input(self.input.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_input_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.md");
        std::fs::write(&path, "```js title=a.js\nx\n```").unwrap();
        assert!(read_input(Some(&path)).unwrap().contains("title=a.js"));
    }

    #[test]
    fn test_read_input_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_input(Some(&dir.path().join("missing.md"))).unwrap_err();
        assert!(err.chain().any(|c| c.is::<std::io::Error>()));
    }

    #[test]
    fn test_cli_parses_preview_flags() {
        let cli = Cli::try_parse_from(["forge", "-v", "preview", "out.md", "--port", "4000", "--wait"])
            .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Preview(args) => {
                assert_eq!(args.port, Some(4000));
                assert!(args.wait);
            }
            _ => panic!("expected preview command"),
        }
    }
}
