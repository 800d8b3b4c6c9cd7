//! # forge_runner
//!
//! npm toolchain execution and build orchestration for webforge.
//!
//! # Features
//!
//! - **Toolchain trait**: one seam for the real npm CLI and the mock
//! - **Timeouts**: every step is bounded; a timeout counts as a failure
//! - **Diagnostics**: failures carry the stage and captured output
//! - **Mock Toolchain**: scripted responses and build artifacts for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use forge_runner::{BuildConfig, BuildOrchestrator, NpmToolchain};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let npm = NpmToolchain::detect()?;
//!     let orchestrator = BuildOrchestrator::new(Arc::new(npm), BuildConfig::default());
//!
//!     match orchestrator.build(Path::new("./app")).await {
//!         Ok(artifact) => println!("built into {}", artifact.output_dir.display()),
//!         Err(failure) => eprintln!("{}\n{}", failure, failure.diagnostics()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod npm;
pub mod orchestrator;
pub mod toolchain;

pub use config::BuildConfig;
pub use error::{RunnerError, RunnerResult};
pub use mock::{MockResponse, MockToolchain};
pub use npm::{execute_with_streaming, LogStream, NpmToolchain};
pub use orchestrator::{
    missing_dev_dependencies, BuildArtifact, BuildFailure, BuildOrchestrator, BuildStage,
    StepRecord,
};
pub use toolchain::{ExecutionResult, Invocation, Toolchain};
