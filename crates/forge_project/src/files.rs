//! The in-memory file map and its materialization on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ProjectError, ProjectResult};
use crate::sanitize::{is_safe_path, sanitize_path};

/// Directories never read back from a materialized workspace.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git"];

/// Content of a single project file.
///
/// The text/binary decision is made once, during normalization; downstream
/// stages never sniff content again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContent {
    /// Text view of the content, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Raw bytes of the content.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

impl From<String> for FileContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FileContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

/// Mapping from relative project path to file content.
///
/// Keys are sanitized on insertion, so the map never holds absolute paths
/// or `..` segments. A later insert for the same path replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMap {
    files: BTreeMap<String, FileContent>,
}

impl FileMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, sanitizing its path. Returns the key actually used,
    /// or `None` if the path sanitized to nothing.
    pub fn insert(&mut self, path: &str, content: impl Into<FileContent>) -> Option<String> {
        let key = sanitize_path(path);
        if key.is_empty() {
            debug!("Dropping file with empty sanitized path: {:?}", path);
            return None;
        }
        self.files.insert(key.clone(), content.into());
        Some(key)
    }

    /// Insert only if no file exists at the path. Returns true if inserted.
    pub fn insert_if_absent(&mut self, path: &str, content: impl Into<FileContent>) -> bool {
        let key = sanitize_path(path);
        if key.is_empty() || self.files.contains_key(&key) {
            return false;
        }
        self.files.insert(key, content.into());
        true
    }

    pub fn get(&self, path: &str) -> Option<&FileContent> {
        self.files.get(path)
    }

    pub fn get_text(&self, path: &str) -> Option<&str> {
        self.files.get(path).and_then(FileContent::as_text)
    }

    pub fn remove(&mut self, path: &str) -> Option<FileContent> {
        self.files.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All paths, in sorted order.
    pub fn paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileContent)> {
        self.files.iter()
    }

    /// Concatenation of all text contents, used for heuristic scanning.
    pub fn joined_text(&self) -> String {
        self.files
            .values()
            .filter_map(FileContent::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Write every file below `root`, creating parent directories.
    pub fn materialize(&self, root: &Path) -> ProjectResult<Vec<PathBuf>> {
        fs::create_dir_all(root)?;
        let mut written = Vec::with_capacity(self.files.len());

        for (path, content) in &self.files {
            if !is_safe_path(path) {
                return Err(ProjectError::PathEscape(path.clone()));
            }
            let target = root.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, content.as_bytes())?;
            debug!("Wrote: {}", path);
            written.push(target);
        }

        Ok(written)
    }

    /// Read a materialized directory back into a file map.
    ///
    /// Files that are valid UTF-8 come back as text, everything else as bytes.
    /// Dependency and VCS directories are skipped.
    pub fn read_from_dir(root: &Path) -> ProjectResult<Self> {
        if !root.is_dir() {
            return Err(ProjectError::MissingWorkspace(root.to_path_buf()));
        }

        let mut map = Self::new();
        let walker = WalkDir::new(root).min_depth(1).into_iter().filter_entry(|e| {
            !(e.file_type().is_dir()
                && SKIPPED_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
        });

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let key = relative.to_string_lossy().replace('\\', "/");
            let bytes = fs::read(entry.path())?;
            let content = match String::from_utf8(bytes) {
                Ok(text) => FileContent::Text(text),
                Err(e) => FileContent::Binary(e.into_bytes()),
            };
            map.insert(&key, content);
        }

        Ok(map)
    }
}

impl<K: AsRef<str>, V: Into<FileContent>> FromIterator<(K, V)> for FileMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (path, content) in iter {
            map.insert(path.as_ref(), content);
        }
        map
    }
}
