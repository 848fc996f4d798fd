//! Helpers for drive paths
//!
//! File paths are absolute, slash separated and never end with a slash.
//! Directory paths always end with a slash, the root being `/`.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("invalid file path: {0}")]
    Invalid(String),
    #[error("cannot move {from} into itself ({to})")]
    MoveIntoSelf { from: String, to: String },
}

fn file_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(/[A-Za-z0-9\-_+.]+)+$").expect("static regex"))
}

/// Check that `path` is a well formed file path
pub fn validate_file_path(path: &str) -> Result<(), PathError> {
    if !file_path_regex().is_match(path) {
        return Err(PathError::Invalid(path.to_string()));
    }
    if path.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(PathError::Invalid(path.to_string()));
    }
    Ok(())
}

/// Turn any directory-ish string into `/a/b/` form
pub fn normalize_dir(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}/", segments.join("/"))
}

pub fn join(dir: &str, name: &str) -> String {
    format!("{}{}", normalize_dir(dir), name)
}

/// Parent directory of a file or directory path
pub fn parent(path: &str) -> String {
    let normalized = normalize_dir(path);
    let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
    match segments.len() {
        0 | 1 => "/".to_string(),
        n => format!("/{}/", segments[..n - 1].join("/")),
    }
}

/// Last segment of a path, empty for the root
pub fn file_name(path: &str) -> &str {
    path.split('/').filter(|s| !s.is_empty()).last().unwrap_or("")
}

/// Directory a file at `new_path` would land in
pub fn destination_parent(new_path: &str) -> String {
    let segments: Vec<&str> = new_path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() <= 1 {
        return "/".to_string();
    }
    format!("/{}/", segments[..segments.len() - 1].join("/"))
}

/// Whether `path` lies somewhere under the directory `dir`
pub fn is_within(path: &str, dir: &str) -> bool {
    path.starts_with(&normalize_dir(dir))
}

/// Rewrite `path` from under `from` to under `to`, if it is there
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    let from = normalize_dir(from);
    path.strip_prefix(from.as_str())
        .map(|rest| format!("{}{}", normalize_dir(to), rest))
}

/// Every ancestor directory of a file path, excluding the root
///
/// `/a/b/c.txt` yields `/a/` and `/a/b/`.
pub fn ancestors(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    (1..segments.len())
        .map(|n| format!("/{}/", segments[..n].join("/")))
        .collect()
}

/// Pick a name for a copy of `name` that `taken` does not reject
///
/// `report.pdf` becomes `report_copy.pdf`, then `report_copy_2.pdf`, etc.
pub fn copy_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    let (base, ext) = match name.rfind('.') {
        Some(i) if i > 0 => (&name[..i], &name[i..]),
        _ => (name, ""),
    };
    let mut candidate = format!("{base}_copy{ext}");
    let mut counter = 2;
    while taken(&candidate) {
        candidate = format!("{base}_copy_{counter}{ext}");
        counter += 1;
    }
    candidate
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_normalize_dir() {
        assert_eq!(normalize_dir("foo"), "/foo/");
        assert_eq!(normalize_dir("/foo"), "/foo/");
        assert_eq!(normalize_dir("//foo///bar//"), "/foo/bar/");
        assert_eq!(normalize_dir(""), "/");
        assert_eq!(normalize_dir("/"), "/");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/foo", "bar.txt"), "/foo/bar.txt");
        assert_eq!(join("foo//", "bar.txt"), "/foo/bar.txt");
        assert_eq!(join("/", "bar.txt"), "/bar.txt");
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("/foo/bar/"), "/foo/");
        assert_eq!(parent("/foo/"), "/");
        assert_eq!(parent("/"), "/");
        assert_eq!(parent("/foo/bar.txt"), "/foo/");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/foo/bar"), "bar");
        assert_eq!(file_name("/foo/bar/"), "bar");
        assert_eq!(file_name("/"), "");
    }

    #[test]
    fn test_destination_parent() {
        assert_eq!(destination_parent("/foo/bar"), "/foo/");
        assert_eq!(destination_parent("/foo"), "/");
    }

    #[test]
    fn test_validate_file_path() {
        assert!(validate_file_path("/docs/report.pdf").is_ok());
        assert!(validate_file_path("/a-b_c+d.e").is_ok());
        assert!(validate_file_path("docs/report.pdf").is_err());
        assert!(validate_file_path("/docs/").is_err());
        assert!(validate_file_path("/docs//report.pdf").is_err());
        assert!(validate_file_path("/my docs/report.pdf").is_err());
        assert!(validate_file_path("/docs/../etc").is_err());
        assert!(validate_file_path("").is_err());
    }

    #[test]
    fn test_is_within_respects_segments() {
        assert!(is_within("/a/b/x", "/a/b/"));
        assert!(is_within("/a/b/x", "/a/b"));
        assert!(!is_within("/a/bc/x", "/a/b"));
        assert!(is_within("/anything", "/"));
    }

    #[test]
    fn test_rebase() {
        assert_eq!(rebase("/a/b/x", "/a/b/", "/a/d/"), Some("/a/d/x".into()));
        assert_eq!(rebase("/a/b/c/y", "/a/b", "/z"), Some("/z/c/y".into()));
        assert_eq!(rebase("/a/c/z", "/a/b/", "/a/d/"), None);
    }

    #[test]
    fn test_ancestors() {
        assert_eq!(ancestors("/a/b/c.txt"), vec!["/a/".to_string(), "/a/b/".to_string()]);
        assert!(ancestors("/c.txt").is_empty());
    }

    #[test]
    fn test_copy_name() {
        assert_eq!(copy_name("report.pdf", |_| false), "report_copy.pdf");
        assert_eq!(
            copy_name("report.pdf", |n| n == "report_copy.pdf"),
            "report_copy_2.pdf"
        );
        assert_eq!(copy_name("README", |_| false), "README_copy");
        assert_eq!(copy_name(".env", |_| false), ".env_copy");
    }
}
