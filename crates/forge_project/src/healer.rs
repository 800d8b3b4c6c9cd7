//! Dependency healing driven by heuristic content scanning.
//!
//! Detection is a plain case-insensitive substring search over every
//! supplied file. It is an accepted approximation: a comment mentioning a
//! library is a false positive, an unusual import path a false negative.
//! Detected capabilities are healed independently; when several UI systems
//! show up together, all of them are healed and none is preferred.

use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::files::FileMap;
use crate::manifest::PackageManifest;
use crate::scaffold::{BASE_STYLESHEET, BUILD_CONFIG, ENTRY_DOCUMENT, ENTRY_SCRIPT, MANIFEST};

const TAILWIND_DIRECTIVES: &str = "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n";
const BOOTSTRAP_CSS_IMPORT: &str = "bootstrap/dist/css/bootstrap.min.css";
const BOOTSTRAP_CDN_LINK: &str = r#"<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css" crossorigin="anonymous">"#;
const PWA_PLUGIN_CALL: &str = "VitePWA({ strategies: 'generateSW', registerType: 'autoUpdate' })";
const PWA_IMPORT: &str = "import { VitePWA } from 'vite-plugin-pwa'";
const REACT_PLUGIN_IMPORT: &str = "import react from '@vitejs/plugin-react'";

const POSTCSS_CONFIG: &str = r#"export default {
  plugins: {
    tailwindcss: {},
    autoprefixer: {},
  },
}
"#;

const TAILWIND_CONFIG: &str = r#"/** @type {import('tailwindcss').Config} */
export default {
  content: [
    './index.html',
    './src/**/*.{js,jsx,ts,tsx}',
  ],
  theme: {
    extend: {},
  },
  plugins: [],
}
"#;

/// A library or plugin the project appears to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTag {
    Tailwind,
    Bootstrap,
    Mui,
    Chakra,
    ChakraIcons,
    ReactIcons,
    VitePwa,
}

impl CapabilityTag {
    /// Runtime dependencies this capability needs.
    pub fn dependencies(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Tailwind | Self::VitePwa => &[],
            Self::Bootstrap => &[("bootstrap", "^5.3.3")],
            Self::Mui => &[
                ("@mui/material", "^5.15.20"),
                ("@mui/icons-material", "^5.15.20"),
                ("@emotion/react", "^11.11.4"),
                ("@emotion/styled", "^11.11.5"),
            ],
            Self::Chakra => &[
                ("@chakra-ui/react", "^2.8.2"),
                ("@emotion/react", "^11.11.4"),
                ("@emotion/styled", "^11.11.5"),
                ("framer-motion", "^11.0.0"),
            ],
            Self::ChakraIcons => &[("@chakra-ui/icons", "^2.1.0")],
            Self::ReactIcons => &[("react-icons", "^5.2.1")],
        }
    }

    /// Build-time-only dependencies this capability needs.
    pub fn dev_dependencies(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Tailwind => &[
                ("tailwindcss", "^3.4.7"),
                ("postcss", "^8.4.41"),
                ("autoprefixer", "^10.4.20"),
            ],
            Self::VitePwa => &[("vite-plugin-pwa", "^0.20.5")],
            _ => &[],
        }
    }

    /// Whether this is a full UI/styling system (as opposed to an add-on).
    pub fn is_ui_system(&self) -> bool {
        matches!(self, Self::Tailwind | Self::Bootstrap | Self::Mui | Self::Chakra)
    }
}

impl fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tailwind => "tailwind",
            Self::Bootstrap => "bootstrap",
            Self::Mui => "mui",
            Self::Chakra => "chakra",
            Self::ChakraIcons => "chakra_icons",
            Self::ReactIcons => "react_icons",
            Self::VitePwa => "vite_pwa",
        };
        write!(f, "{}", name)
    }
}

/// Changes made by a healing pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealReport {
    pub capabilities: BTreeSet<CapabilityTag>,
    pub added_dependencies: Vec<String>,
    pub added_dev_dependencies: Vec<String>,
    pub files_written: Vec<String>,
}

/// Detects capabilities and reconciles the manifest and wiring files.
pub struct DependencyHealer {
    bootstrap_class_pattern: Regex,
    app_element_pattern: Regex,
    pwa_call_pattern: Regex,
    plugins_pattern: Regex,
    define_config_pattern: Regex,
}

impl Default for DependencyHealer {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyHealer {
    pub fn new() -> Self {
        Self {
            bootstrap_class_pattern: Regex::new(
                r#"(?i)class(?:Name)?="[^"]*(?:container|row|col-\d|btn)[^"]*""#,
            )
            .unwrap(),
            app_element_pattern: Regex::new(r"<App\s*/>").unwrap(),
            pwa_call_pattern: Regex::new(r"\bVitePWA\s*\(").unwrap(),
            plugins_pattern: Regex::new(r"plugins\s*:\s*\[").unwrap(),
            define_config_pattern: Regex::new(r"export\s+default\s+defineConfig\(\s*\{").unwrap(),
        }
    }

    /// Classify the supplied files into capability tags.
    pub fn detect(&self, files: &FileMap) -> BTreeSet<CapabilityTag> {
        let lower = files.joined_text().to_lowercase();
        let mut tags = BTreeSet::new();

        let has_tailwind_config = files
            .paths()
            .iter()
            .any(|p| p.ends_with("tailwind.config.js"));
        if lower.contains("tailwind") || has_tailwind_config {
            tags.insert(CapabilityTag::Tailwind);
        }

        let bootstrap_classes = files
            .iter()
            .filter_map(|(_, content)| content.as_text())
            .any(|text| self.bootstrap_class_pattern.is_match(text));
        if lower.contains("bootstrap") || bootstrap_classes {
            tags.insert(CapabilityTag::Bootstrap);
        }

        if lower.contains("@mui/material") || lower.contains("@material-ui/core") {
            tags.insert(CapabilityTag::Mui);
        }
        if lower.contains("@chakra-ui/react") {
            tags.insert(CapabilityTag::Chakra);
        }
        if lower.contains("@chakra-ui/icons") {
            tags.insert(CapabilityTag::ChakraIcons);
        }
        if lower.contains("react-icons") {
            tags.insert(CapabilityTag::ReactIcons);
        }
        if lower.contains("vite-plugin-pwa") || lower.contains("vitepwa") {
            tags.insert(CapabilityTag::VitePwa);
        }

        debug!("Detected capabilities: {:?}", tags);
        tags
    }

    /// Detect on `supplied` and heal `files` (the normalized project).
    pub fn heal_detected(&self, supplied: &FileMap, files: &mut FileMap) -> HealReport {
        let tags = self.detect(supplied);
        self.heal(files, &tags)
    }

    /// Apply healing for the given capability set.
    pub fn heal(&self, files: &mut FileMap, tags: &BTreeSet<CapabilityTag>) -> HealReport {
        let mut report = HealReport {
            capabilities: tags.clone(),
            ..Default::default()
        };

        let ui_systems: Vec<_> = tags.iter().filter(|t| t.is_ui_system()).collect();
        if ui_systems.len() > 1 {
            warn!(
                "Multiple UI systems detected ({:?}); healing all of them without arbitration",
                ui_systems
            );
        }

        self.merge_manifest(files, tags, &mut report);

        for tag in tags {
            match tag {
                CapabilityTag::Tailwind => self.ensure_tailwind_setup(files, &mut report),
                CapabilityTag::Bootstrap => self.ensure_bootstrap_import(files, &mut report),
                CapabilityTag::Chakra => self.wrap_provider(
                    files,
                    "ChakraProvider",
                    "import { ChakraProvider } from '@chakra-ui/react'",
                    None,
                    "<ChakraProvider><App /></ChakraProvider>",
                    &mut report,
                ),
                CapabilityTag::Mui => self.wrap_provider(
                    files,
                    "ThemeProvider",
                    "import { ThemeProvider, createTheme } from '@mui/material/styles'",
                    Some("const theme = createTheme({})"),
                    "<ThemeProvider theme={theme}><App /></ThemeProvider>",
                    &mut report,
                ),
                CapabilityTag::VitePwa => self.fix_pwa_config(files, &mut report),
                CapabilityTag::ChakraIcons | CapabilityTag::ReactIcons => {}
            }
        }

        info!(
            "Healed project: {} capabilities, {} deps added, {} dev deps added, {} files written",
            report.capabilities.len(),
            report.added_dependencies.len(),
            report.added_dev_dependencies.len(),
            report.files_written.len()
        );
        report
    }

    fn merge_manifest(
        &self,
        files: &mut FileMap,
        tags: &BTreeSet<CapabilityTag>,
        report: &mut HealReport,
    ) {
        let Some(raw) = files.get_text(MANIFEST) else {
            return;
        };
        let mut manifest = match PackageManifest::parse(raw) {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping dependency merge, manifest unparseable: {}", e);
                return;
            }
        };

        for tag in tags {
            for (name, version) in tag.dependencies() {
                if manifest.add_dependency(name, version) {
                    report.added_dependencies.push(name.to_string());
                }
            }
            for (name, version) in tag.dev_dependencies() {
                if manifest.add_dev_dependency(name, version) {
                    report.added_dev_dependencies.push(name.to_string());
                }
            }
        }

        if !report.added_dependencies.is_empty() || !report.added_dev_dependencies.is_empty() {
            files.insert(MANIFEST, manifest.to_json_pretty());
            report.files_written.push(MANIFEST.to_string());
        }
    }

    fn ensure_tailwind_setup(&self, files: &mut FileMap, report: &mut HealReport) {
        for (path, content) in [
            ("postcss.config.js", POSTCSS_CONFIG),
            ("tailwind.config.js", TAILWIND_CONFIG),
        ] {
            if files.insert_if_absent(path, content) {
                report.files_written.push(path.to_string());
            }
        }

        let css = files.get_text(BASE_STYLESHEET).unwrap_or_default();
        if !css.contains("@tailwind base;") {
            let patched = format!("{}\n{}", TAILWIND_DIRECTIVES, css);
            files.insert(BASE_STYLESHEET, patched);
            report.files_written.push(BASE_STYLESHEET.to_string());
        }
    }

    fn ensure_bootstrap_import(&self, files: &mut FileMap, report: &mut HealReport) {
        if let Some(entry) = files.get_text(ENTRY_SCRIPT) {
            if !entry.contains(BOOTSTRAP_CSS_IMPORT) {
                let patched = format!("import '{}';\n{}", BOOTSTRAP_CSS_IMPORT, entry);
                files.insert(ENTRY_SCRIPT, patched);
                report.files_written.push(ENTRY_SCRIPT.to_string());
            }
            return;
        }

        if let Some(html) = files.get_text(ENTRY_DOCUMENT) {
            if html.contains("bootstrap.min.css") {
                return;
            }
            if let Some(at) = html.find("</head>") {
                let mut patched = html.to_string();
                patched.insert_str(at, &format!("\n{}\n", BOOTSTRAP_CDN_LINK));
                files.insert(ENTRY_DOCUMENT, patched);
                report.files_written.push(ENTRY_DOCUMENT.to_string());
            }
        }
    }

    /// Wrap the first `<App />` in the entry script with a provider element.
    fn wrap_provider(
        &self,
        files: &mut FileMap,
        provider: &str,
        import: &str,
        setup: Option<&str>,
        wrapped: &str,
        report: &mut HealReport,
    ) {
        let Some(entry) = files.get_text(ENTRY_SCRIPT) else {
            return;
        };
        if entry.contains(provider) || !self.app_element_pattern.is_match(entry) {
            return;
        }

        let body = self.app_element_pattern.replace(entry, wrapped).to_string();
        let mut patched = insert_after_imports(&body, import);
        if let Some(setup) = setup {
            patched = insert_after_imports(&patched, setup);
        }

        debug!("Wrapped <App /> with {}", provider);
        files.insert(ENTRY_SCRIPT, patched);
        report.files_written.push(ENTRY_SCRIPT.to_string());
    }

    fn fix_pwa_config(&self, files: &mut FileMap, report: &mut HealReport) {
        let Some(config) = files.get_text(BUILD_CONFIG) else {
            return;
        };
        let has_import = config.contains("from 'vite-plugin-pwa'")
            || config.contains("from \"vite-plugin-pwa\"");
        let has_call = self.pwa_call_pattern.is_match(config);

        let mut patched = config.to_string();
        if !has_call {
            if self.plugins_pattern.is_match(&patched) {
                patched = self
                    .plugins_pattern
                    .replace(&patched, |caps: &regex::Captures| {
                        format!("{}{}, ", &caps[0], PWA_PLUGIN_CALL)
                    })
                    .to_string();
            } else if self.define_config_pattern.is_match(&patched) {
                patched = self
                    .define_config_pattern
                    .replace(&patched, |caps: &regex::Captures| {
                        format!("{}\n  plugins: [react(), {}],", &caps[0], PWA_PLUGIN_CALL)
                    })
                    .to_string();
                if !patched.contains("from '@vitejs/plugin-react'")
                    && !patched.contains("from \"@vitejs/plugin-react\"")
                {
                    patched = insert_after_imports(&patched, REACT_PLUGIN_IMPORT);
                }
            } else {
                warn!("Could not locate plugin list in {}", BUILD_CONFIG);
                return;
            }
        }
        if !has_import {
            patched = insert_after_imports(&patched, PWA_IMPORT);
        }

        if patched != config {
            files.insert(BUILD_CONFIG, patched);
            report.files_written.push(BUILD_CONFIG.to_string());
        }
    }
}

/// Insert a line after the last top-level `import` line, or at the top.
fn insert_after_imports(text: &str, line: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let at = lines
        .iter()
        .rposition(|l| l.trim_start().starts_with("import "))
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 1);
    out.extend_from_slice(&lines[..at]);
    out.push(line);
    out.extend_from_slice(&lines[at..]);

    let mut joined = out.join("\n");
    if text.ends_with('\n') {
        joined.push('\n');
    }
    joined
}
