//! Path sanitization for extracted file paths.
//!
//! Paths come straight out of model output, so they are treated as hostile:
//! the result of [`sanitize_path`] is always relative and never contains a
//! `..` component, which keeps it inside the workspace once joined.

/// Normalize an extracted path into a safe, forward-slash relative path.
///
/// Rules, in order:
/// 1. backslashes become forward slashes
/// 2. a single leading slash is stripped
/// 3. every `../` occurrence is removed (repeated until none remain)
///
/// Afterwards, empty, `.` and `..` components and drive prefixes are dropped
/// so that inputs like `//etc/passwd` or a trailing `..` cannot escape either.
pub fn sanitize_path(raw: &str) -> String {
    let mut path = raw.trim().replace('\\', "/");

    if let Some(stripped) = path.strip_prefix('/') {
        path = stripped.to_string();
    }

    while path.contains("../") {
        path = path.replace("../", "");
    }

    path.split('/')
        .enumerate()
        .filter(|(i, part)| {
            !(part.is_empty() || *part == "." || *part == ".." || (*i == 0 && part.ends_with(':')))
        })
        .map(|(_, part)| part)
        .collect::<Vec<_>>()
        .join("/")
}

/// Check whether a path is already in sanitized form.
pub fn is_safe_path(path: &str) -> bool {
    !path.is_empty() && sanitize_path(path) == path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Component, Path};

    #[test]
    fn test_backslashes_and_leading_slash() {
        assert_eq!(sanitize_path("\\src\\App.jsx"), "src/App.jsx");
        assert_eq!(sanitize_path("/index.html"), "index.html");
    }

    #[test]
    fn test_parent_segments_removed_everywhere() {
        assert_eq!(sanitize_path("../../etc/passwd"), "etc/passwd");
        assert_eq!(sanitize_path("src/../../secret.txt"), "src/secret.txt");
        assert_eq!(sanitize_path("....//x"), "x");
        assert_eq!(sanitize_path("a/.."), "a");
    }

    #[test]
    fn test_never_absolute_or_escaping() {
        let inputs = [
            "//etc/shadow",
            "..\\..\\windows\\system32",
            "C:/Users/me/file.txt",
            "./src/./main.jsx",
            "..",
            "/",
        ];
        for input in inputs {
            let out = sanitize_path(input);
            let path = Path::new(&out);
            assert!(path.is_relative(), "{input} -> {out}");
            assert!(
                !path.components().any(|c| matches!(c, Component::ParentDir)),
                "{input} -> {out}"
            );
        }
    }

    #[test]
    fn test_is_safe_path() {
        assert!(is_safe_path("src/App.jsx"));
        assert!(!is_safe_path("/src/App.jsx"));
        assert!(!is_safe_path(""));
    }
}
