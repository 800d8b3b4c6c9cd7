//! Fenced-block extraction from raw model output.
//!
//! Recognized opening markers look like ```` ```jsx title=src/App.jsx ````
//! (three or four backticks, optional language tag, `title=` attribute).
//! A block closes on a bare marker of the same length. Parsing never fails:
//! malformed input yields whatever could be recovered, possibly nothing.

use regex::Regex;
use tracing::{debug, info};

use crate::files::FileMap;

/// A single fenced block recovered from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    /// Path from the `title=` attribute, unsanitized.
    pub path: String,
    /// Optional language tag following the fence.
    pub language: Option<String>,
    /// Block body with trailing whitespace trimmed.
    pub content: String,
    /// Number of backticks (3 or 4) that opened the block.
    pub fence_len: usize,
}

struct OpenBlock {
    path: String,
    language: Option<String>,
    fence_len: usize,
    lines: Vec<String>,
}

impl OpenBlock {
    fn finish(self) -> ParsedBlock {
        ParsedBlock {
            path: self.path,
            language: self.language,
            content: self.lines.join("\n").trim_end().to_string(),
            fence_len: self.fence_len,
        }
    }
}

/// Line-oriented parser for `title=`-annotated fenced blocks.
pub struct FenceParser {
    open_pattern: Regex,
    close_pattern: Regex,
}

impl Default for FenceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FenceParser {
    pub fn new() -> Self {
        Self {
            open_pattern: Regex::new(
                r"^\s*(?P<fence>`{3,4})(?P<lang>[^\s`]+)?\s*title=(?P<path>.+?)\s*$",
            )
            .unwrap(),
            close_pattern: Regex::new(r"^\s*(?P<fence>`{3,4})\s*$").unwrap(),
        }
    }

    /// Parse all blocks in input order. Duplicate paths are kept here;
    /// [`FenceParser::extract`] applies last-wins.
    pub fn parse_blocks(&self, raw: &str) -> Vec<ParsedBlock> {
        let text = raw
            .trim_start_matches('\u{feff}')
            .replace("\r\n", "\n")
            .replace('\r', "\n");

        let mut blocks = Vec::new();
        let mut current: Option<OpenBlock> = None;

        for line in text.split('\n') {
            if let Some(caps) = self.open_pattern.captures(line) {
                // A new opener implicitly commits whatever was open.
                if let Some(open) = current.take() {
                    debug!("Implicitly closing block: {}", open.path);
                    blocks.push(open.finish());
                }
                current = Some(OpenBlock {
                    path: strip_quotes(caps["path"].trim()).to_string(),
                    language: caps.name("lang").map(|m| m.as_str().to_string()),
                    fence_len: caps["fence"].len(),
                    lines: Vec::new(),
                });
                continue;
            }

            let Some(fence_len) = current.as_ref().map(|open| open.fence_len) else {
                continue;
            };
            let closes = self
                .close_pattern
                .captures(line)
                .is_some_and(|caps| caps["fence"].len() == fence_len);

            if closes {
                if let Some(open) = current.take() {
                    blocks.push(open.finish());
                }
            } else if let Some(open) = current.as_mut() {
                open.lines.push(line.to_string());
            }
        }

        if let Some(open) = current.take() {
            debug!("Committing unterminated block: {}", open.path);
            blocks.push(open.finish());
        }

        blocks
    }

    /// Extract a sanitized file map. Later blocks for the same path win.
    pub fn extract(&self, raw: &str) -> FileMap {
        let blocks = self.parse_blocks(raw);
        let mut files = FileMap::new();
        for block in &blocks {
            files.insert(&block.path, block.content.as_str());
        }
        info!(
            "Extracted {} files from {} fenced blocks",
            files.len(),
            blocks.len()
        );
        files
    }
}

/// Convenience wrapper around [`FenceParser::extract`].
pub fn extract_files(raw: &str) -> FileMap {
    FenceParser::new().extract(raw)
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block() {
        let files = extract_files("```jsx title=src/App.jsx\nexport default function App(){return null}\n```");
        assert_eq!(files.len(), 1);
        assert_eq!(
            files.get_text("src/App.jsx"),
            Some("export default function App(){return null}")
        );
    }

    #[test]
    fn test_unterminated_block_keeps_trailing_lines() {
        let files = extract_files("```css title=src/index.css\nbody {}\n.a { color: red; }\n");
        assert_eq!(files.get_text("src/index.css"), Some("body {}\n.a { color: red; }"));
    }

    #[test]
    fn test_implicit_close_on_new_opener() {
        let raw = "```js title=a.js\nconst a = 1;\n```js title=b.js\nconst b = 2;\n```";
        let files = extract_files(raw);
        assert_eq!(files.get_text("a.js"), Some("const a = 1;"));
        assert_eq!(files.get_text("b.js"), Some("const b = 2;"));
    }

    #[test]
    fn test_mismatched_fence_is_content() {
        let raw = "````md title=README.md\n# Title\n```bash\nnpm install\n```\n````";
        let files = extract_files(raw);
        assert_eq!(
            files.get_text("README.md"),
            Some("# Title\n```bash\nnpm install\n```")
        );
    }

    #[test]
    fn test_bom_and_crlf() {
        let raw = "\u{feff}```html title=index.html\r\n<html></html>\r\n```\r\n";
        let files = extract_files(raw);
        assert_eq!(files.get_text("index.html"), Some("<html></html>"));
    }

    #[test]
    fn test_last_block_wins() {
        let raw = "```js title=a.js\nfirst\n```\n```js title=a.js\nsecond\n```";
        let parser = FenceParser::new();
        assert_eq!(parser.parse_blocks(raw).len(), 2);
        assert_eq!(parser.extract(raw).get_text("a.js"), Some("second"));
    }

    #[test]
    fn test_paths_are_sanitized() {
        let raw = "``` title=\"../../src\\main.jsx\"\nx\n```";
        let files = extract_files(raw);
        assert_eq!(files.paths(), vec!["src/main.jsx".to_string()]);
    }

    #[test]
    fn test_garbage_yields_empty() {
        assert!(extract_files("").is_empty());
        assert!(extract_files("no fences here\n```\nstray\n```").is_empty());
    }

    #[test]
    fn test_block_metadata() {
        let blocks = FenceParser::new().parse_blocks("````tsx title=src/x.tsx\nlet x = 1;   \n\n````");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].fence_len, 4);
        assert_eq!(blocks[0].language.as_deref(), Some("tsx"));
        assert_eq!(blocks[0].content, "let x = 1;");
    }
}
