//! Self-contained document from a build output.
//!
//! Local `src`/`href` references in the root document are replaced with
//! base64 data URIs, and a small isolation block keeps the page from
//! framing tricks and from navigating away. Only the root document's direct
//! references are inlined; chunks loaded by scripts at runtime are not.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use forge_project::sanitize_path;
use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::error::{PreviewError, PreviewResult};

const ROOT_DOCUMENT: &str = "index.html";

const ISOLATION_HEAD: &str = r#"<meta http-equiv="X-Frame-Options" content="SAMEORIGIN" />
<meta http-equiv="Content-Security-Policy" content="default-src 'self' 'unsafe-inline' 'unsafe-eval' data: blob:;" />
<base target="_self" />
<script>
(function () {
  document.addEventListener('click', function (e) {
    var link = e.target && e.target.closest ? e.target.closest('a[href]') : null;
    if (!link) return;
    var href = link.getAttribute('href') || '';
    if (/^([a-z][a-z0-9+.-]*:)?\/\//i.test(href)) e.preventDefault();
  }, true);
  window.open = function () { return null; };
})();
</script>
"#;

/// A root document with its local assets embedded.
#[derive(Debug, Clone)]
pub struct InlinedDocument {
    pub html: String,
    /// References replaced with data URIs.
    pub inlined: usize,
    /// Local references that could not be found in the output.
    pub missing: Vec<String>,
}

/// Rewrites local asset references into data URIs.
pub struct Inliner {
    reference_pattern: Regex,
    head_close_pattern: Regex,
}

impl Default for Inliner {
    fn default() -> Self {
        Self::new()
    }
}

impl Inliner {
    pub fn new() -> Self {
        Self {
            reference_pattern: Regex::new(r#"(^|\s)(src|href)\s*=\s*["']([^"']+)["']"#).unwrap(),
            head_close_pattern: Regex::new(r"(?i)</head\s*>").unwrap(),
        }
    }

    /// Read `dist/index.html` and inline everything it references locally.
    pub fn inline(&self, dist: &Path) -> PreviewResult<InlinedDocument> {
        let document_path = dist.join(ROOT_DOCUMENT);
        if !document_path.is_file() {
            return Err(PreviewError::MissingDocument(document_path));
        }
        let html = fs::read_to_string(&document_path)?;
        let document = self.inline_html(&html, dist);
        info!(
            "Inlined {} assets into preview document ({} missing)",
            document.inlined,
            document.missing.len()
        );
        Ok(document)
    }

    /// Inline references in `html`, resolving them against `dist`.
    pub fn inline_html(&self, html: &str, dist: &Path) -> InlinedDocument {
        let mut inlined = 0;
        let mut missing = Vec::new();

        let rewritten = self
            .reference_pattern
            .replace_all(html, |caps: &Captures| {
                let lead = &caps[1];
                let attr = &caps[2];
                let reference = &caps[3];
                if !is_local(reference) {
                    return caps[0].to_string();
                }
                match read_asset(dist, reference) {
                    Some((mime, bytes)) => {
                        inlined += 1;
                        debug!("Inlining {}", reference);
                        format!("{}{}=\"data:{};base64,{}\"", lead, attr, mime, STANDARD.encode(bytes))
                    }
                    None => {
                        missing.push(reference.to_string());
                        caps[0].to_string()
                    }
                }
            })
            .to_string();

        InlinedDocument {
            html: self.inject_isolation(&rewritten),
            inlined,
            missing,
        }
    }

    fn inject_isolation(&self, html: &str) -> String {
        if let Some(m) = self.head_close_pattern.find(html) {
            let mut out = String::with_capacity(html.len() + ISOLATION_HEAD.len());
            out.push_str(&html[..m.start()]);
            out.push_str(ISOLATION_HEAD);
            out.push_str(&html[m.start()..]);
            out
        } else {
            format!("{}{}", ISOLATION_HEAD, html)
        }
    }
}

/// Whether a reference points into the build output.
fn is_local(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    !(reference.is_empty()
        || reference.starts_with('#')
        || reference.starts_with("//")
        || lower.starts_with("http:")
        || lower.starts_with("https:")
        || lower.starts_with("data:")
        || lower.starts_with("blob:")
        || lower.starts_with("mailto:")
        || lower.starts_with("javascript:"))
}

fn read_asset(dist: &Path, reference: &str) -> Option<(&'static str, Vec<u8>)> {
    let cut = reference.find(['?', '#']).unwrap_or(reference.len());
    let relative = sanitize_path(&reference[..cut]);
    if relative.is_empty() {
        return None;
    }
    let path = dist.join(&relative);
    if !path.is_file() {
        return None;
    }
    let bytes = fs::read(&path).ok()?;
    Some((mime_for(&relative), bytes))
}

fn mime_for(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "js" | "mjs" => "text/javascript",
        "css" => "text/css",
        "html" => "text/html",
        "json" | "webmanifest" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const DOCUMENT: &str = r##"<!doctype html>
<html>
  <head>
    <link rel="icon" href="/vite.svg" />
    <script type="module" crossorigin src="/assets/index-abc123.js"></script>
    <link rel="stylesheet" href="./assets/index-def456.css?v=1">
    <link rel="preconnect" href="https://fonts.googleapis.com">
  </head>
  <body><div id="root"></div><a href="#top">top</a></body>
</html>"##;

    fn dist(root: &Path) -> std::path::PathBuf {
        let dist = root.join("dist");
        fs::create_dir_all(dist.join("assets")).unwrap();
        fs::write(dist.join("index.html"), DOCUMENT).unwrap();
        fs::write(dist.join("vite.svg"), "<svg/>").unwrap();
        fs::write(dist.join("assets/index-abc123.js"), "console.log('app')").unwrap();
        dist
    }

    #[test]
    fn test_local_assets_inlined() {
        let dir = tempdir().unwrap();
        let document = Inliner::new().inline(&dist(dir.path())).unwrap();

        assert_eq!(document.inlined, 2);
        assert_eq!(document.missing, vec!["./assets/index-def456.css?v=1"]);
        let encoded = STANDARD.encode("console.log('app')");
        assert!(document
            .html
            .contains(&format!("src=\"data:text/javascript;base64,{}\"", encoded)));
        assert!(document.html.contains("href=\"data:image/svg+xml;base64,"));
        assert!(document.html.contains("href=\"https://fonts.googleapis.com\""));
        assert!(document.html.contains("href=\"#top\""));
    }

    #[test]
    fn test_isolation_injected_in_head() {
        let dir = tempdir().unwrap();
        let document = Inliner::new().inline(&dist(dir.path())).unwrap();
        let head_end = document.html.find("</head>").unwrap();
        let isolation = document.html.find("X-Frame-Options").unwrap();
        assert!(isolation < head_end);
    }

    #[test]
    fn test_reference_cannot_escape_dist() {
        let dir = tempdir().unwrap();
        let dist = dist(dir.path());
        fs::write(dir.path().join("secret.txt"), "secret").unwrap();

        let document = Inliner::new().inline_html(r#"<img src="../secret.txt">"#, &dist);
        assert_eq!(document.inlined, 0);
        assert!(!document.html.contains(&STANDARD.encode("secret")));
    }

    #[test]
    fn test_missing_document() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Inliner::new().inline(dir.path()),
            Err(PreviewError::MissingDocument(_))
        ));
    }

    #[test]
    fn test_prefixed_attributes_left_alone() {
        let dir = tempdir().unwrap();
        let dist = dist(dir.path());
        let html = r#"<html><head></head><body><img data-src="/vite.svg" src="/vite.svg"></body></html>"#;

        let document = Inliner::new().inline_html(html, &dist);

        assert_eq!(document.inlined, 1);
        assert!(document.html.contains(r#"data-src="/vite.svg""#));
        assert!(document.html.contains(r#" src="data:image/svg+xml;base64,"#));
    }
}
