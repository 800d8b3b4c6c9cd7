//! Package manifest model and lineage repair.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ProjectResult;

const DEFAULT_NAME: &str = "vite-react-app";
const DEFAULT_VERSION: &str = "0.0.0";
const LEGACY_BUNDLER: &str = "react-scripts";
const BUILD_TOOL: &str = "vite";

/// A structured package descriptor.
///
/// `dependencies` and `devDependencies` are kept disjoint: the add methods
/// refuse a name already present in either section and never overwrite a
/// pinned version. Unknown top-level fields round-trip through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub module_type: Option<String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(rename = "devDependencies", default)]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// What happened to a supplied manifest during repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum ManifestAction {
    /// The supplied manifest was usable and kept verbatim.
    Kept,
    /// No manifest was supplied; the canonical one was created.
    Created,
    /// The supplied manifest was replaced; identity fields were carried over when possible.
    Replaced { reason: String },
}

/// Result of [`PackageManifest::repair`].
#[derive(Debug, Clone)]
pub struct ManifestRepair {
    pub manifest: PackageManifest,
    pub action: ManifestAction,
}

impl PackageManifest {
    /// Parse a manifest document.
    pub fn parse(raw: &str) -> ProjectResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// The canonical manifest for the supported build tool.
    pub fn canonical(name: &str, version: &str, description: Option<&str>) -> Self {
        let scripts = [
            ("dev", "vite"),
            ("build", "vite build"),
            ("preview", "vite preview"),
        ];
        let dependencies = [
            ("react", "^18.2.0"),
            ("react-dom", "^18.2.0"),
            ("react-router-dom", "^6.8.0"),
        ];
        let dev_dependencies = [
            ("@vitejs/plugin-react", "^4.2.1"),
            ("vite", "^5.0.8"),
        ];

        Self {
            name: Some(name.to_string()),
            private: Some(true),
            version: Some(version.to_string()),
            description: description.map(String::from),
            module_type: Some("module".to_string()),
            scripts: to_map(&scripts),
            dependencies: to_map(&dependencies),
            dev_dependencies: to_map(&dev_dependencies),
            extra: serde_json::Map::new(),
        }
    }

    /// Canonical manifest with default identity fields.
    pub fn canonical_default() -> Self {
        Self::canonical(DEFAULT_NAME, DEFAULT_VERSION, None)
    }

    /// Whether the scripts reference the unsupported legacy bundler or lack
    /// a build-tool invocation in both `build` and `dev`.
    pub fn is_legacy(&self) -> bool {
        let uses_legacy = self.scripts.values().any(|s| s.contains(LEGACY_BUNDLER));
        let invokes_build_tool = ["build", "dev"].iter().any(|key| {
            self.scripts
                .get(*key)
                .is_some_and(|s| s.contains(BUILD_TOOL))
        });
        uses_legacy || !invokes_build_tool
    }

    /// Decide what manifest the project should carry.
    pub fn repair(raw: Option<&str>) -> ManifestRepair {
        let Some(raw) = raw else {
            debug!("No manifest supplied, creating canonical manifest");
            return ManifestRepair {
                manifest: Self::canonical_default(),
                action: ManifestAction::Created,
            };
        };

        match Self::parse(raw) {
            Ok(parsed) if !parsed.is_legacy() => ManifestRepair {
                manifest: parsed,
                action: ManifestAction::Kept,
            },
            Ok(parsed) => {
                warn!("Replacing manifest with legacy or missing build tooling");
                let manifest = Self::canonical(
                    parsed.name.as_deref().unwrap_or(DEFAULT_NAME),
                    parsed.version.as_deref().unwrap_or(DEFAULT_VERSION),
                    parsed.description.as_deref(),
                );
                ManifestRepair {
                    manifest,
                    action: ManifestAction::Replaced {
                        reason: "legacy bundler or missing build tool invocation".to_string(),
                    },
                }
            }
            Err(e) => {
                warn!("Manifest could not be parsed, using canonical manifest: {}", e);
                ManifestRepair {
                    manifest: Self::canonical_default(),
                    action: ManifestAction::Replaced {
                        reason: format!("unparseable manifest: {}", e),
                    },
                }
            }
        }
    }

    /// Whether a package is declared in either section.
    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }

    /// Add a runtime dependency unless it is declared anywhere. Returns true if added.
    pub fn add_dependency(&mut self, name: &str, version: &str) -> bool {
        if self.has_dependency(name) {
            return false;
        }
        self.dependencies.insert(name.to_string(), version.to_string());
        true
    }

    /// Add a build-time dependency unless it is declared anywhere. Returns true if added.
    pub fn add_dev_dependency(&mut self, name: &str, version: &str) -> bool {
        if self.has_dependency(name) {
            return false;
        }
        self.dev_dependencies.insert(name.to_string(), version.to_string());
        true
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_json_pretty(&self) -> String {
        let mut out = serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string());
        out.push('\n');
        out
    }
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_bundler_replaced_preserving_identity() {
        let raw = r#"{
            "name": "shop-front",
            "version": "2.1.0",
            "description": "A shop",
            "scripts": { "start": "react-scripts start", "build": "react-scripts build" }
        }"#;
        let repair = PackageManifest::repair(Some(raw));
        assert!(matches!(repair.action, ManifestAction::Replaced { .. }));
        assert_eq!(repair.manifest.name.as_deref(), Some("shop-front"));
        assert_eq!(repair.manifest.version.as_deref(), Some("2.1.0"));
        assert_eq!(repair.manifest.description.as_deref(), Some("A shop"));
        assert_eq!(repair.manifest.scripts.get("build").map(String::as_str), Some("vite build"));
    }

    #[test]
    fn test_missing_build_tool_is_legacy() {
        let manifest = PackageManifest::parse(r#"{"scripts": {"build": "webpack"}}"#).unwrap();
        assert!(manifest.is_legacy());
    }

    #[test]
    fn test_valid_manifest_kept() {
        let raw = r#"{"name": "ok", "scripts": {"dev": "vite", "build": "vite build"}, "keywords": ["a"]}"#;
        let repair = PackageManifest::repair(Some(raw));
        assert_eq!(repair.action, ManifestAction::Kept);
        assert!(repair.manifest.extra.contains_key("keywords"));
    }

    #[test]
    fn test_unparseable_manifest_falls_back() {
        let repair = PackageManifest::repair(Some("{ not json"));
        assert!(matches!(repair.action, ManifestAction::Replaced { .. }));
        assert_eq!(repair.manifest.name.as_deref(), Some(DEFAULT_NAME));
    }

    #[test]
    fn test_add_is_additive_and_disjoint() {
        let mut manifest = PackageManifest::canonical_default();
        assert!(!manifest.add_dependency("react", "^99.0.0"));
        assert_eq!(manifest.dependencies["react"], "^18.2.0");
        assert!(!manifest.add_dependency("vite", "^1.0.0"));
        assert!(!manifest.dependencies.contains_key("vite"));
        assert!(manifest.add_dev_dependency("tailwindcss", "^3.4.7"));
        assert!(!manifest.add_dependency("tailwindcss", "^3.4.7"));
    }
}
