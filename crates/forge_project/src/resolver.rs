//! Static resolution of relative imports in a materialized project.
//!
//! Every script under `src/` is scanned for `./` and `../` import literals.
//! A reference that resolves to nothing on disk gets a stand-in file so the
//! build never fails on a file the generated code mentions but never defined.
//! Running the resolver again over the same tree creates nothing.

use std::fs;
use std::path::{Component, Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ProjectResult;

const SOURCE_DIR: &str = "src";
const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs"];
const STYLE_EXTENSIONS: &[&str] = &["css", "scss", "less"];
const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "ico"];

/// Extensions tried, in order, when a reference has none that resolves.
const PROBE_EXTENSIONS: &[&str] = &[
    "jsx", "js", "tsx", "ts", "mjs", "css", "scss", "less", "json", "svg", "png", "jpg", "jpeg",
    "gif", "webp", "ico",
];
const INDEX_FILES: &[&str] = &["index.jsx", "index.js", "index.tsx", "index.ts"];

const PLACEHOLDER_SVG: &str = "<svg xmlns='http://www.w3.org/2000/svg' width='1' height='1'/>\n";
const PLACEHOLDER_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
const PLACEHOLDER_GIF: &str = "R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

/// Outcome of a resolution pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveReport {
    /// Script files scanned.
    pub scanned: usize,
    /// Relative references found across all scanned files.
    pub references: usize,
    /// References that pointed outside the project root and were ignored.
    pub escaped: usize,
    /// Stand-in files created, relative to the project root.
    pub created: Vec<String>,
}

/// Scans relative imports and synthesizes stand-ins for missing targets.
pub struct ReferenceResolver {
    binding_pattern: Regex,
    side_effect_pattern: Regex,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self {
            binding_pattern: Regex::new(
                r#"\b(?:import|export)\s+[^'";]*?\bfrom\s*['"](\.{1,2}/[^'"\n]+)['"]"#,
            )
            .unwrap(),
            side_effect_pattern: Regex::new(r#"\bimport\s*['"](\.{1,2}/[^'"\n]+)['"]"#).unwrap(),
        }
    }

    /// Relative reference literals in a script, in source order, query and
    /// hash suffixes removed.
    pub fn references_in(&self, source: &str) -> Vec<String> {
        let mut found: Vec<(usize, String)> = self
            .binding_pattern
            .captures_iter(source)
            .chain(self.side_effect_pattern.captures_iter(source))
            .filter_map(|caps| caps.get(1))
            .map(|m| {
                let literal = m.as_str();
                let cut = literal.find(['?', '#']).unwrap_or(literal.len());
                (m.start(), literal[..cut].to_string())
            })
            .collect();
        found.sort_by_key(|(at, _)| *at);
        found.into_iter().map(|(_, r)| r).collect()
    }

    /// Resolve every relative reference under `root/src`.
    pub fn resolve(&self, root: &Path) -> ProjectResult<ResolveReport> {
        let mut report = ResolveReport::default();
        let source_root = root.join(SOURCE_DIR);
        if !source_root.is_dir() {
            debug!("No source directory at {}", source_root.display());
            return Ok(report);
        }

        let scripts: Vec<PathBuf> = WalkDir::new(&source_root)
            .into_iter()
            .filter_entry(|e| e.file_name() != "node_modules")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| SCRIPT_EXTENSIONS.contains(&extension_of(p).as_str()))
            .collect();

        for script in &scripts {
            let Ok(source) = fs::read_to_string(script) else {
                debug!("Skipping unreadable script: {}", script.display());
                continue;
            };
            report.scanned += 1;

            let Some(relative_dir) = script
                .parent()
                .and_then(|dir| dir.strip_prefix(root).ok())
            else {
                continue;
            };

            for reference in self.references_in(&source) {
                report.references += 1;
                let Some(target) = join_lexically(relative_dir, &reference) else {
                    debug!("Ignoring reference escaping the project: {}", reference);
                    report.escaped += 1;
                    continue;
                };
                match self.ensure_target(root, &target) {
                    Ok(Some(created)) => report.created.push(created),
                    Ok(None) => {}
                    Err(e) => warn!("Skipping stand-in for {}: {}", reference, e),
                }
            }
        }

        info!(
            "Resolved {} references in {} scripts, created {} stand-ins",
            report.references,
            report.scanned,
            report.created.len()
        );
        Ok(report)
    }

    /// Returns the relative path of a stand-in if one had to be created.
    fn ensure_target(&self, root: &Path, target: &Path) -> ProjectResult<Option<String>> {
        let absolute = root.join(target);

        if absolute.is_file() {
            return Ok(None);
        }
        if PROBE_EXTENSIONS
            .iter()
            .any(|ext| with_appended_extension(&absolute, ext).is_file())
        {
            return Ok(None);
        }
        if absolute.is_dir() && INDEX_FILES.iter().any(|f| absolute.join(f).is_file()) {
            return Ok(None);
        }

        let (stub_path, content) = stand_in_for(target, absolute.is_dir());
        let stub_absolute = root.join(&stub_path);
        if let Some(parent) = stub_absolute.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&stub_absolute, content)?;

        let created = stub_path.to_string_lossy().replace('\\', "/");
        debug!("Created stand-in: {}", created);
        Ok(Some(created))
    }
}

/// Convenience wrapper around [`ReferenceResolver::resolve`].
pub fn resolve_references(root: &Path) -> ProjectResult<ResolveReport> {
    ReferenceResolver::new().resolve(root)
}

/// Join a `./` or `../` reference onto a root-relative directory without
/// touching the filesystem. `None` if the result leaves the root.
fn join_lexically(base: &Path, reference: &str) -> Option<PathBuf> {
    let mut parts: Vec<String> = base
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    for segment in reference.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other.to_string()),
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some(parts.iter().collect())
}

/// Choose the stand-in path and payload for an unresolved target.
fn stand_in_for(target: &Path, is_dir: bool) -> (PathBuf, Vec<u8>) {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if is_dir {
        let capitalized = starts_uppercase(&name);
        let file = if capitalized { "index.jsx" } else { "index.js" };
        return (target.join(file), script_stub(&name, capitalized));
    }

    let ext = extension_of(target);
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match ext.as_str() {
        e if STYLE_EXTENSIONS.contains(&e) => (target.to_path_buf(), Vec::new()),
        "json" => (target.to_path_buf(), b"{}\n".to_vec()),
        "svg" => (target.to_path_buf(), PLACEHOLDER_SVG.as_bytes().to_vec()),
        "gif" => (target.to_path_buf(), decode_placeholder(PLACEHOLDER_GIF)),
        e if RASTER_EXTENSIONS.contains(&e) => {
            (target.to_path_buf(), decode_placeholder(PLACEHOLDER_PNG))
        }
        e if SCRIPT_EXTENSIONS.contains(&e) => {
            let capitalized = starts_uppercase(&stem);
            (target.to_path_buf(), script_stub(&stem, capitalized))
        }
        _ => {
            // No usable extension: the whole file name is the module name.
            let capitalized = starts_uppercase(&name);
            let ext = if capitalized { "jsx" } else { "js" };
            (
                with_appended_extension(target, ext),
                script_stub(&name, capitalized),
            )
        }
    }
}

fn script_stub(name: &str, component: bool) -> Vec<u8> {
    if component {
        format!(
            "export default function {}() {{\n  return null;\n}}\n",
            component_identifier(name)
        )
        .into_bytes()
    } else {
        b"export default {};\n".to_vec()
    }
}

/// Reduce a file name to a valid component identifier.
fn component_identifier(name: &str) -> String {
    let ident: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    match ident.chars().next() {
        Some(c) if c.is_ascii_uppercase() => ident,
        _ => "Placeholder".to_string(),
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

fn decode_placeholder(encoded: &str) -> Vec<u8> {
    STANDARD.decode(encoded).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, path: &str, content: &str) {
        let target = root.join(path);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(target, content).unwrap();
    }

    #[test]
    fn test_references_in() {
        let resolver = ReferenceResolver::new();
        let source = r#"import React from 'react'
import {
  Header,
  Footer,
} from "./components/Layout"
import './App.css'
import logo from '../assets/logo.svg?url'
export { helper } from './utils/helper'
"#;
        assert_eq!(
            resolver.references_in(source),
            vec![
                "./components/Layout",
                "./App.css",
                "../assets/logo.svg",
                "./utils/helper",
            ]
        );
    }

    #[test]
    fn test_join_lexically() {
        assert_eq!(
            join_lexically(Path::new("src"), "./components/Widget"),
            Some(PathBuf::from("src/components/Widget"))
        );
        assert_eq!(
            join_lexically(Path::new("src/pages"), "../styles/./main.css"),
            Some(PathBuf::from("src/styles/main.css"))
        );
        assert_eq!(join_lexically(Path::new("src"), "../../etc/passwd"), None);
    }

    #[test]
    fn test_missing_component_synthesized() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/App.jsx", "import Widget from './components/Widget'\n");

        let report = resolve_references(dir.path()).unwrap();
        assert_eq!(report.created, vec!["src/components/Widget.jsx"]);
        let stub = fs::read_to_string(dir.path().join("src/components/Widget.jsx")).unwrap();
        assert!(stub.contains("export default function Widget()"));
    }

    #[test]
    fn test_stand_in_kinds() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "src/main.jsx",
            "import './theme.scss'\nimport data from './data.json'\nimport icon from './icon.svg'\nimport photo from './photo.png'\nimport api from './api'\n",
        );

        resolve_references(dir.path()).unwrap();
        let root = dir.path().join("src");
        assert_eq!(fs::read(root.join("theme.scss")).unwrap(), b"");
        assert_eq!(fs::read_to_string(root.join("data.json")).unwrap(), "{}\n");
        assert!(fs::read_to_string(root.join("icon.svg")).unwrap().starts_with("<svg"));
        assert_eq!(&fs::read(root.join("photo.png")).unwrap()[..4], b"\x89PNG");
        assert_eq!(fs::read_to_string(root.join("api.js")).unwrap(), "export default {};\n");
    }

    #[test]
    fn test_existing_targets_resolve() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "src/App.jsx",
            "import Nav from './Nav'\nimport pages from './pages'\nimport './App.css'\n",
        );
        write(dir.path(), "src/Nav.tsx", "export default function Nav(){return null}");
        write(dir.path(), "src/pages/index.js", "export default []");
        write(dir.path(), "src/App.css", "");

        let report = resolve_references(dir.path()).unwrap();
        assert_eq!(report.references, 3);
        assert!(report.created.is_empty());
    }

    #[test]
    fn test_directory_without_index() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/App.jsx", "import Cards from './Cards'\n");
        fs::create_dir_all(dir.path().join("src/Cards")).unwrap();

        let report = resolve_references(dir.path()).unwrap();
        assert_eq!(report.created, vec!["src/Cards/index.jsx"]);
    }

    #[test]
    fn test_escaping_reference_ignored() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/App.jsx", "import x from '../../outside'\n");

        let report = resolve_references(dir.path()).unwrap();
        assert_eq!(report.escaped, 1);
        assert!(report.created.is_empty());
    }

    #[test]
    fn test_second_pass_creates_nothing() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "src/App.jsx",
            "import A from './A'\nimport b from './lib/b'\nimport './a.css'\nimport x from './x.gif'\n",
        );

        let first = resolve_references(dir.path()).unwrap();
        assert_eq!(first.created.len(), 4);
        let second = resolve_references(dir.path()).unwrap();
        assert!(second.created.is_empty());
    }

    #[test]
    fn test_file_used_as_directory_is_skipped() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/utils.js", "export const x = 1;\n");
        write(
            dir.path(),
            "src/App.jsx",
            "import h from './utils.js/helpers'\nimport Nav from './Nav'\n",
        );

        let report = resolve_references(dir.path()).unwrap();

        assert_eq!(report.created, vec!["src/Nav.jsx".to_string()]);
        assert!(dir.path().join("src/utils.js").is_file());
    }
}
