//! # forge_preview
//!
//! Workspace lifecycle, preview serving and the degradation chain.
//!
//! A build attempt runs inside a fresh workspace under a shared root owned
//! by [`PreviewContext`]. The result is a [`PreviewOutcome`]:
//!
//! 1. `Served`: build output behind a local server with SPA fallback
//! 2. `Inlined`: the root document with its assets embedded
//! 3. `Descriptive`: the build failed; supplied files and diagnostics
//! 4. `ErrorPreview`: anything unexpected, ASCII-sanitized
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use forge_preview::{PreviewConfig, PreviewContext, PreviewPipeline, ShutdownGuard};
//! use forge_project::extract_files;
//! use forge_runner::NpmToolchain;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PreviewConfig::default();
//!     let context = Arc::new(PreviewContext::from_config(&config));
//!     let _guard = ShutdownGuard::new(context.clone());
//!
//!     let pipeline = PreviewPipeline::new(context, config, Arc::new(NpmToolchain::detect()?));
//!     let files = extract_files("```jsx title=src/App.jsx\nexport default () => null\n```");
//!     let outcome = pipeline.create_build_preview(&files).await;
//!     println!("{} ({})", outcome.state_name(), outcome.success());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod inline;
pub mod outcome;
pub mod pipeline;
pub mod server;

pub use config::{ForgeConfig, PreviewConfig};
pub use context::{PreviewContext, ShutdownGuard};
pub use error::{PreviewError, PreviewResult};
pub use inline::{InlinedDocument, Inliner};
pub use outcome::{ascii_safe, html_escape, PreviewOutcome};
pub use pipeline::{PreviewPipeline, PROJECT_DIR};
pub use server::{spa_router, RunningPreviewServer};
