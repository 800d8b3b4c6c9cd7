//! webforge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Build or preview degraded
//! - 4: I/O error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const DEGRADED: u8 = 3;
    pub const IO_ERROR: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "forge=debug"
    } else if cli.quiet {
        "forge=warn"
    } else {
        "forge=info"
    };

    let mut filter = EnvFilter::from_default_env().add_directive("warn".parse().unwrap());
    if let Ok(directive) = level.parse() {
        filter = filter.add_directive(directive);
    }

    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Extract(args) => commands::extract::execute(args).await,
        Commands::Heal(args) => commands::heal::execute(args).await,
        Commands::Preview(args) => commands::preview::execute(args).await,
        Commands::Archive(args) => commands::archive::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.chain().any(|cause| cause.is::<std::io::Error>()) {
        return ExitCodes::IO_ERROR;
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("degraded") || msg.contains("build failed") {
        ExitCodes::DEGRADED
    } else if msg.contains("argument") || msg.contains("not found") || msg.contains("invalid") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
