//! Result of the preview degradation chain.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::inline::InlinedDocument;

/// Longest diagnostics tail kept in a descriptive preview.
const MAX_DIAGNOSTICS: usize = 8000;

/// Which preview strategy produced a result.
///
/// Only `Served` and `Inlined` are functional previews; the other two are
/// degraded but still renderable.
#[derive(Debug, Clone)]
pub enum PreviewOutcome {
    /// A live server is answering at `url`.
    Served { url: String, workspace: PathBuf },
    /// Self-contained document with all local assets embedded.
    Inlined { document: InlinedDocument },
    /// The build did not complete; lists what was supplied.
    Descriptive {
        files: Vec<String>,
        reason: String,
        diagnostics: String,
    },
    /// Unexpected failure, message already ASCII-safe.
    ErrorPreview { message: String },
}

impl PreviewOutcome {
    pub fn descriptive(
        files: Vec<String>,
        reason: impl Into<String>,
        diagnostics: impl Into<String>,
    ) -> Self {
        Self::Descriptive {
            files,
            reason: reason.into(),
            diagnostics: tail(&diagnostics.into(), MAX_DIAGNOSTICS),
        }
    }

    /// Error preview with the message reduced to ASCII.
    pub fn error(message: impl AsRef<str>) -> Self {
        Self::ErrorPreview {
            message: ascii_safe(message.as_ref()),
        }
    }

    /// Whether this is a functional preview.
    pub fn success(&self) -> bool {
        matches!(self, Self::Served { .. } | Self::Inlined { .. })
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Served { .. } => "served",
            Self::Inlined { .. } => "inlined",
            Self::Descriptive { .. } => "descriptive",
            Self::ErrorPreview { .. } => "error",
        }
    }

    /// Render as an embeddable HTML fragment.
    pub fn render(&self) -> String {
        match self {
            Self::Served { url, .. } => {
                let url = html_escape(url);
                format!(
                    r#"<div class="preview-container">
  <h3>Live Preview</h3>
  <iframe src="{url}" width="100%" height="600px" style="border: 1px solid #ddd; border-radius: 5px; background: white;" loading="lazy" referrerpolicy="no-referrer"></iframe>
  <p class="preview-note">Server running at <a href="{url}" target="_blank">{url}</a></p>
</div>"#
                )
            }
            Self::Inlined { document } => {
                let data_url = format!("data:text/html;base64,{}", STANDARD.encode(&document.html));
                format!(
                    r#"<div class="preview-container">
  <h3>Live Preview (inline)</h3>
  <iframe src="{data_url}" width="100%" height="600px" style="border: 1px solid #ddd; border-radius: 5px; background: white;" sandbox="allow-scripts allow-same-origin allow-forms allow-popups" referrerpolicy="no-referrer" name="preview-frame"></iframe>
  <p class="preview-note">Build succeeded; showing a self-contained copy of the output.</p>
</div>"#
                )
            }
            Self::Descriptive {
                files,
                reason,
                diagnostics,
            } => {
                let items: String = files
                    .iter()
                    .map(|f| format!("    <li>{}</li>\n", html_escape(f)))
                    .collect();
                let diagnostics = if diagnostics.trim().is_empty() {
                    String::new()
                } else {
                    format!(
                        "  <details>\n    <summary>Build output</summary>\n    <pre>{}</pre>\n  </details>\n",
                        html_escape(diagnostics)
                    )
                };
                format!(
                    "<div class=\"preview-container\">\n  <h3>Preview unavailable: the build did not complete</h3>\n  <p>{}</p>\n  <p>{} generated file(s):</p>\n  <ul class=\"file-list\">\n{}  </ul>\n{}</div>",
                    html_escape(reason),
                    files.len(),
                    items,
                    diagnostics
                )
            }
            Self::ErrorPreview { message } => format!(
                "<div class=\"preview-container\">\n  <h3>Preview Error</h3>\n  <p style=\"color: #dc3545;\">{}</p>\n</div>",
                html_escape(message)
            ),
        }
    }
}

/// Replace every non-ASCII character with `?`.
pub fn ascii_safe(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}

pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Last `max` bytes of `text`, cut on a character boundary.
fn tail(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_flags() {
        let served = PreviewOutcome::Served {
            url: "http://127.0.0.1:3000".into(),
            workspace: PathBuf::from("/tmp/ws"),
        };
        let inlined = PreviewOutcome::Inlined {
            document: InlinedDocument {
                html: "<html></html>".into(),
                inlined: 0,
                missing: Vec::new(),
            },
        };
        assert!(served.success());
        assert!(inlined.success());
        assert!(!PreviewOutcome::descriptive(vec![], "failed", "").success());
        assert!(!PreviewOutcome::error("boom").success());
    }

    #[test]
    fn test_error_message_sanitized_and_escaped() {
        let outcome = PreviewOutcome::error("Fehler: Größe <script>");
        let PreviewOutcome::ErrorPreview { message } = &outcome else {
            panic!("expected error preview");
        };
        assert_eq!(message, "Fehler: Gr??e <script>");
        let html = outcome.render();
        assert!(html.contains("Gr??e &lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_descriptive_lists_files() {
        let outcome = PreviewOutcome::descriptive(
            vec!["src/App.jsx".into(), "package.json".into()],
            "production build failed",
            "error <during> build",
        );
        let html = outcome.render();
        assert!(html.contains("<li>src/App.jsx</li>"));
        assert!(html.contains("2 generated file(s)"));
        assert!(html.contains("error &lt;during&gt; build"));
    }

    #[test]
    fn test_inlined_renders_data_url() {
        let outcome = PreviewOutcome::Inlined {
            document: InlinedDocument {
                html: "<p>hi</p>".into(),
                inlined: 0,
                missing: Vec::new(),
            },
        };
        assert!(outcome
            .render()
            .contains(&format!("data:text/html;base64,{}", STANDARD.encode("<p>hi</p>"))));
    }

    #[test]
    fn test_tail_truncates() {
        let long = "x".repeat(10);
        assert_eq!(tail(&long, 4), "...xxxx");
        assert_eq!(tail("short", 10), "short");
    }
}
