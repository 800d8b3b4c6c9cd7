//! Project normalization: reshape a loosely keyed file map into the
//! canonical layout and repair conflicting manifests.
//!
//! The normalizer only ever adds or patches; supplied files that are still
//! relevant are never overwritten by scaffold content.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::files::{FileContent, FileMap};
use crate::manifest::{ManifestAction, PackageManifest};
use crate::scaffold::{
    self, APP_COMPONENT, APP_STYLESHEET, BASE_STYLESHEET, BUILD_CONFIG, ENTRY_DOCUMENT,
    ENTRY_SCRIPT, MANIFEST, MOUNT_ID,
};

/// Generic keys (bare language tags) and their canonical targets.
const GENERIC_KEYS: &[(&str, &str)] = &[
    ("jsx", APP_COMPONENT),
    ("json", MANIFEST),
    ("markdown", "README.md"),
    ("md", "README.md"),
    ("html", ENTRY_DOCUMENT),
    ("css", BASE_STYLESHEET),
];

/// Extensions whose content may arrive as a data URI or bare base64.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "ico", "webp", "svg", "bmp"];

/// Summary of the changes a normalization pass made.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizeReport {
    /// `(from, to)` key remaps.
    pub remapped: Vec<(String, String)>,
    /// Generic keys dropped because their canonical target already existed.
    pub dropped: Vec<String>,
    /// Scaffold files created because they were absent.
    pub synthesized: Vec<String>,
    /// Files decoded from data URIs or base64 into bytes.
    pub decoded: Vec<String>,
    /// Whether the supplied entry document was patched in place.
    pub entry_patched: bool,
    /// What happened to the manifest.
    pub manifest_action: Option<ManifestAction>,
}

/// Reshapes extracted files into the canonical project layout.
pub struct ProjectNormalizer {
    data_uri_pattern: Regex,
    mount_pattern: Regex,
    entry_script_pattern: Regex,
    app_import_pattern: Regex,
}

impl Default for ProjectNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectNormalizer {
    pub fn new() -> Self {
        Self {
            data_uri_pattern: Regex::new(r"(?s)^data:([^;,]+);base64,(.+)$").unwrap(),
            mount_pattern: Regex::new(&format!(r#"(?:^|\s)id\s*=\s*["']{MOUNT_ID}["']"#)).unwrap(),
            entry_script_pattern: Regex::new(r#"(?:^|\s)src\s*=\s*["']\.?/?src/main\.jsx["']"#).unwrap(),
            app_import_pattern: Regex::new(r#"import\s+App\s+from\s+['"]\./App['"];?"#).unwrap(),
        }
    }

    /// Normalize a file map. Never fails; every step degrades gracefully.
    pub fn normalize(&self, input: &FileMap) -> (FileMap, NormalizeReport) {
        let mut files = input.clone();
        let mut report = NormalizeReport::default();

        self.remap_generic_keys(&mut files, &mut report);
        self.decode_binary_assets(&mut files, &mut report);
        self.repair_manifest(&mut files, &mut report);
        self.ensure_entry_document(&mut files, &mut report);
        self.complete_scaffold(&mut files, &mut report);

        info!(
            "Normalized project: {} files ({} remapped, {} synthesized, {} decoded)",
            files.len(),
            report.remapped.len(),
            report.synthesized.len(),
            report.decoded.len()
        );
        (files, report)
    }

    fn remap_generic_keys(&self, files: &mut FileMap, report: &mut NormalizeReport) {
        for (generic, target) in GENERIC_KEYS {
            if !files.contains(generic) {
                continue;
            }
            // A bare component only becomes App when no entry script exists either.
            let blocked = files.contains(target)
                || (*generic == "jsx" && files.contains(ENTRY_SCRIPT));
            if blocked {
                warn!("Dropping generic key '{}': {} already provided", generic, target);
                files.remove(generic);
                report.dropped.push(generic.to_string());
                continue;
            }
            if let Some(content) = files.remove(generic) {
                debug!("Remapping '{}' -> {}", generic, target);
                files.insert(target, content);
                report.remapped.push((generic.to_string(), target.to_string()));
            }
        }

        if files.contains("public/index.html") && !files.contains(ENTRY_DOCUMENT) {
            if let Some(content) = files.remove("public/index.html") {
                files.insert(ENTRY_DOCUMENT, content);
                report
                    .remapped
                    .push(("public/index.html".to_string(), ENTRY_DOCUMENT.to_string()));
            }
        }
    }

    fn decode_binary_assets(&self, files: &mut FileMap, report: &mut NormalizeReport) {
        for path in files.paths() {
            let ext = extension(&path);
            if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }
            let Some(text) = files.get_text(&path) else {
                continue;
            };
            let trimmed = text.trim();

            let decoded = if let Some(caps) = self.data_uri_pattern.captures(trimmed) {
                decode_base64(&caps[2])
            } else if ext == "svg" {
                // Plain SVG markup stays text.
                None
            } else {
                decode_base64(trimmed)
            };

            match decoded {
                Some(bytes) => {
                    debug!("Decoded binary asset: {}", path);
                    files.insert(&path, FileContent::Binary(bytes));
                    report.decoded.push(path);
                }
                None if ext != "svg" => {
                    warn!("Could not decode {} as base64, keeping text", path);
                }
                None => {}
            }
        }
    }

    fn repair_manifest(&self, files: &mut FileMap, report: &mut NormalizeReport) {
        let repair = PackageManifest::repair(files.get_text(MANIFEST));
        if repair.action != ManifestAction::Kept {
            files.insert(MANIFEST, repair.manifest.to_json_pretty());
        }
        if repair.action == ManifestAction::Created {
            report.synthesized.push(MANIFEST.to_string());
        }
        report.manifest_action = Some(repair.action);
    }

    fn ensure_entry_document(&self, files: &mut FileMap, report: &mut NormalizeReport) {
        match files.get_text(ENTRY_DOCUMENT) {
            Some(html) => {
                let patched = self.patch_entry_document(html);
                if patched != html {
                    info!("Injected mount point or entry script into {}", ENTRY_DOCUMENT);
                    files.insert(ENTRY_DOCUMENT, patched);
                    report.entry_patched = true;
                }
            }
            None => {
                files.insert(ENTRY_DOCUMENT, scaffold::ENTRY_DOCUMENT_HTML);
                report.synthesized.push(ENTRY_DOCUMENT.to_string());
            }
        }
    }

    /// Insert the mount element after `<body ...>` and the module script
    /// before `</body>`, leaving the rest of the document untouched.
    pub fn patch_entry_document(&self, html: &str) -> String {
        let mut html = html.to_string();

        if !self.mount_pattern.is_match(&html) {
            let mount = format!("\n    <div id=\"{MOUNT_ID}\"></div>\n");
            let lower = html.to_ascii_lowercase();
            let body_open_end = lower
                .find("<body")
                .and_then(|start| lower[start..].find('>').map(|end| start + end));
            if let Some(end) = body_open_end {
                html.insert_str(end + 1, &mount);
            } else if let Some(head_end) = lower.find("</head>") {
                let at = head_end + "</head>".len();
                html.insert_str(at, &format!("\n<body>{mount}</body>"));
            } else {
                html.push_str(&mount);
            }
        }

        if !self.entry_script_pattern.is_match(&html) {
            let script = "\n    <script type=\"module\" src=\"/src/main.jsx\"></script>\n";
            match html.to_ascii_lowercase().rfind("</body>") {
                Some(at) => html.insert_str(at, script),
                None => html.push_str(script),
            }
        }

        html
    }

    fn complete_scaffold(&self, files: &mut FileMap, report: &mut NormalizeReport) {
        let mut synthesize = |files: &mut FileMap, path: &str, content: &str| {
            if files.insert_if_absent(path, content) {
                debug!("Synthesized scaffold file: {}", path);
                report.synthesized.push(path.to_string());
            }
        };

        synthesize(files, BUILD_CONFIG, scaffold::BUILD_CONFIG_JS);
        synthesize(files, ".eslintrc.cjs", scaffold::ESLINT_CONFIG);
        synthesize(files, APP_COMPONENT, scaffold::APP_COMPONENT_JSX);
        synthesize(files, ENTRY_SCRIPT, &scaffold::entry_script());
        synthesize(files, BASE_STYLESHEET, scaffold::BASE_STYLESHEET_CSS);
        synthesize(files, APP_STYLESHEET, scaffold::BASE_STYLESHEET_CSS);
        synthesize(files, "vite.svg", scaffold::VITE_LOGO_SVG);
        synthesize(files, "react.svg", scaffold::REACT_LOGO_SVG);

        if let Some(entry) = files.get_text(ENTRY_SCRIPT) {
            if self.app_import_pattern.is_match(entry) {
                let fixed = self
                    .app_import_pattern
                    .replace(entry, "import App from './App.jsx';")
                    .to_string();
                files.insert(ENTRY_SCRIPT, fixed);
            }
        }
    }
}

fn extension(path: &str) -> String {
    path.rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty() && !stem.ends_with('/'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

fn decode_base64(payload: &str) -> Option<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    BASE64.decode(compact.as_bytes()).ok()
}
