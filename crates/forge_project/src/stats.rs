//! Summary statistics over a project file map.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::files::FileMap;

/// Rough size class of a generated project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Complexity::Low => write!(f, "low"),
            Complexity::Medium => write!(f, "medium"),
            Complexity::High => write!(f, "high"),
        }
    }
}

/// Overall shape of a generated project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    ViteReact,
    ViteApp,
    /// More than two JSX files without a build tool.
    ComplexReact,
    ReactApp,
    VanillaJs,
    StaticHtml,
    Unknown,
}

impl fmt::Display for StructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StructureType::ViteReact => "vite_react",
            StructureType::ViteApp => "vite_app",
            StructureType::ComplexReact => "complex_react",
            StructureType::ReactApp => "react_app",
            StructureType::VanillaJs => "vanilla_js",
            StructureType::StaticHtml => "static_html",
            StructureType::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Frameworks and libraries mentioned anywhere in the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Framework {
    Vite,
    React,
    #[serde(rename = "Vue.js")]
    Vue,
    Angular,
    #[serde(rename = "Tailwind CSS")]
    Tailwind,
    Bootstrap,
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Framework::Vite => "Vite",
            Framework::React => "React",
            Framework::Vue => "Vue.js",
            Framework::Angular => "Angular",
            Framework::Tailwind => "Tailwind CSS",
            Framework::Bootstrap => "Bootstrap",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStats {
    pub total_files: usize,
    /// File counts keyed by lowercase extension (`""` for none).
    pub by_extension: BTreeMap<String, usize>,
    pub total_bytes: usize,
    pub average_bytes: usize,
    /// Lines across text files only.
    pub total_lines: usize,
    pub complexity: Complexity,
    pub structure_type: StructureType,
    pub frameworks_detected: BTreeSet<Framework>,
}

impl ProjectStats {
    pub fn compute(files: &FileMap) -> Self {
        let mut by_extension = BTreeMap::new();
        let mut total_bytes = 0;
        let mut total_lines = 0;

        for (path, content) in files.iter() {
            let name = path.rsplit('/').next().unwrap_or(path);
            let ext = match name.rfind('.') {
                Some(i) if i > 0 => name[i + 1..].to_lowercase(),
                _ => String::new(),
            };
            *by_extension.entry(ext).or_insert(0) += 1;
            total_bytes += content.len();
            if let Some(text) = content.as_text() {
                total_lines += text.lines().count();
            }
        }

        let total_files = files.len();
        let complexity = if total_files > 10 || total_lines > 500 {
            Complexity::High
        } else if total_files > 5 || total_lines > 200 {
            Complexity::Medium
        } else {
            Complexity::Low
        };

        let frameworks_detected = detect_frameworks(files);
        let structure_type = structure_of(files, frameworks_detected.contains(&Framework::Vite));

        Self {
            total_files,
            by_extension,
            total_bytes,
            average_bytes: total_bytes.checked_div(total_files).unwrap_or(0),
            total_lines,
            complexity,
            structure_type,
            frameworks_detected,
        }
    }
}

/// Substring scan over paths and contents; false positives are expected.
fn detect_frameworks(files: &FileMap) -> BTreeSet<Framework> {
    let mut found = BTreeSet::new();
    for (path, content) in files.iter() {
        let path = path.to_lowercase();
        let text = content.as_text().map(str::to_lowercase).unwrap_or_default();

        if path.contains("vite.config.") || text.contains("vite") {
            found.insert(Framework::Vite);
        }
        if text.contains("react") || text.contains("jsx") {
            found.insert(Framework::React);
        }
        if text.contains("vue") {
            found.insert(Framework::Vue);
        }
        if text.contains("angular") {
            found.insert(Framework::Angular);
        }
        if text.contains("tailwind") {
            found.insert(Framework::Tailwind);
        }
        if text.contains("bootstrap") {
            found.insert(Framework::Bootstrap);
        }
    }
    found
}

fn structure_of(files: &FileMap, has_vite: bool) -> StructureType {
    let count = |ext: &str| {
        files
            .iter()
            .filter(|(path, _)| path.to_lowercase().ends_with(ext))
            .count()
    };
    let jsx_files = count(".jsx");

    if has_vite && jsx_files > 0 {
        StructureType::ViteReact
    } else if has_vite {
        StructureType::ViteApp
    } else if jsx_files > 2 {
        StructureType::ComplexReact
    } else if jsx_files > 0 {
        StructureType::ReactApp
    } else if count(".js") > 0 {
        StructureType::VanillaJs
    } else if count(".html") > 0 {
        StructureType::StaticHtml
    } else {
        StructureType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_complexity() {
        let files: FileMap = [
            ("src/App.jsx", "a\nb\nc"),
            ("src/main.jsx", "x"),
            ("index.html", "<html></html>"),
            ("README", "readme"),
        ]
        .into_iter()
        .collect();

        let stats = ProjectStats::compute(&files);
        assert_eq!(stats.total_files, 4);
        assert_eq!(stats.by_extension["jsx"], 2);
        assert_eq!(stats.by_extension[""], 1);
        assert_eq!(stats.total_lines, 6);
        assert_eq!(stats.complexity, Complexity::Low);
    }

    #[test]
    fn test_high_complexity_by_lines() {
        let big = "line\n".repeat(501);
        let files: FileMap = [("src/App.jsx", big.as_str())].into_iter().collect();
        assert_eq!(ProjectStats::compute(&files).complexity, Complexity::High);
    }

    #[test]
    fn test_empty_map() {
        let stats = ProjectStats::compute(&FileMap::new());
        assert_eq!(stats.average_bytes, 0);
        assert_eq!(stats.complexity, Complexity::Low);
    }

    #[test]
    fn test_vite_react_structure_and_frameworks() {
        let files: FileMap = [
            ("vite.config.js", "export default {}"),
            ("src/App.jsx", "import React from 'react'\nimport 'bootstrap/dist/css/bootstrap.min.css'"),
        ]
        .into_iter()
        .collect();

        let stats = ProjectStats::compute(&files);
        assert_eq!(stats.structure_type, StructureType::ViteReact);
        assert!(stats.frameworks_detected.contains(&Framework::Vite));
        assert!(stats.frameworks_detected.contains(&Framework::React));
        assert!(stats.frameworks_detected.contains(&Framework::Bootstrap));
        assert!(!stats.frameworks_detected.contains(&Framework::Vue));
    }

    #[test]
    fn test_structure_without_build_tool() {
        let react: FileMap = [("a.jsx", "x"), ("b.jsx", "x"), ("c.jsx", "x")].into_iter().collect();
        assert_eq!(ProjectStats::compute(&react).structure_type, StructureType::ComplexReact);

        let plain: FileMap = [("index.html", "<p>hi</p>"), ("app.js", "run()")].into_iter().collect();
        assert_eq!(ProjectStats::compute(&plain).structure_type, StructureType::VanillaJs);

        let json = serde_json::to_value(ProjectStats::compute(&FileMap::new())).unwrap();
        assert_eq!(json["structure_type"], "unknown");
    }
}
