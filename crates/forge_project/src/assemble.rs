//! End-to-end preparation of a supplied file map into a buildable project.

use std::path::Path;

use tracing::info;

use crate::error::ProjectResult;
use crate::fence::extract_files;
use crate::files::FileMap;
use crate::healer::{DependencyHealer, HealReport};
use crate::normalizer::{NormalizeReport, ProjectNormalizer};
use crate::resolver::{ReferenceResolver, ResolveReport};
use crate::scaffold::default_project;

/// A normalized and healed project, ready to be written to a workspace.
#[derive(Debug, Clone)]
pub struct PreparedProject {
    /// Files as originally supplied (after extraction and sanitization).
    pub supplied: FileMap,
    /// Canonical project files.
    pub files: FileMap,
    pub normalize: NormalizeReport,
    pub heal: HealReport,
    /// True when the supplied map was empty and the default project was used.
    pub used_default: bool,
}

impl PreparedProject {
    /// Normalize then heal. Capability detection runs over the supplied
    /// files, edits land on the normalized ones.
    pub fn prepare(supplied: &FileMap) -> Self {
        let used_default = supplied.is_empty();
        let supplied = if used_default {
            info!("No files supplied, substituting the default project");
            default_project()
        } else {
            supplied.clone()
        };

        let (mut files, normalize) = ProjectNormalizer::new().normalize(&supplied);
        let heal = DependencyHealer::new().heal_detected(&supplied, &mut files);

        Self {
            supplied,
            files,
            normalize,
            heal,
            used_default,
        }
    }

    /// Extract from raw model output, then prepare.
    pub fn from_raw(raw: &str) -> Self {
        Self::prepare(&extract_files(raw))
    }

    /// Write the project below `root` and synthesize missing references.
    pub fn materialize(&self, root: &Path) -> ProjectResult<ResolveReport> {
        self.files.materialize(root)?;
        ReferenceResolver::new().resolve(root)
    }
}
