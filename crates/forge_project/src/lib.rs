//! # forge_project
//!
//! Turns free-form generated text into a canonical, buildable React/Vite
//! project.
//!
//! The stages run leaf-first:
//!
//! - [`FenceParser`] recovers `title=`-annotated fenced blocks
//! - [`sanitize_path`] keeps every key relative and inside the project
//! - [`ProjectNormalizer`] remaps loose keys, repairs the manifest and
//!   completes the scaffold
//! - [`DependencyHealer`] detects UI libraries and reconciles dependencies
//! - [`ReferenceResolver`] creates stand-ins for missing relative imports
//!
//! ## Example
//!
//! ```rust,no_run
//! use forge_project::PreparedProject;
//! use std::path::Path;
//!
//! let raw = "```jsx title=src/App.jsx\nexport default function App(){return null}\n```";
//! let project = PreparedProject::from_raw(raw);
//! let report = project.materialize(Path::new("./app")).unwrap();
//! println!("created {} stand-ins", report.created.len());
//! ```

pub mod archive;
pub mod assemble;
pub mod error;
pub mod fence;
pub mod files;
pub mod healer;
pub mod manifest;
pub mod normalizer;
pub mod resolver;
pub mod sanitize;
pub mod scaffold;
pub mod stats;

pub use archive::{archive_bytes, write_archive};
pub use assemble::PreparedProject;
pub use error::{ProjectError, ProjectResult};
pub use fence::{extract_files, FenceParser, ParsedBlock};
pub use files::{FileContent, FileMap};
pub use healer::{CapabilityTag, DependencyHealer, HealReport};
pub use manifest::{ManifestAction, ManifestRepair, PackageManifest};
pub use normalizer::{NormalizeReport, ProjectNormalizer};
pub use resolver::{resolve_references, ReferenceResolver, ResolveReport};
pub use sanitize::{is_safe_path, sanitize_path};
pub use scaffold::default_project;
pub use stats::{Complexity, Framework, ProjectStats, StructureType};
