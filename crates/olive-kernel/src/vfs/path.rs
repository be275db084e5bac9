//! POSIX-style virtual path helpers.
//!
//! Virtual paths are plain strings, not `std::path::Path`: they never touch
//! the host filesystem and must behave the same on every platform.

/// Normalize a virtual path.
///
/// The result always starts with `/`, has no trailing `/` (except the root
/// itself), and has no empty, `.` or `..` segments. `..` above the root
/// stays at the root.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }

    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Split a path into its segments, ignoring empty ones.
///
/// Callers should pass a normalized path; the root has no segments.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// The last segment of a normalized path, or `/` for the root.
pub fn file_name(path: &str) -> &str {
    match path.rsplit('/').find(|s| !s.is_empty()) {
        Some(name) => name,
        None => "/",
    }
}

/// Strip a mount prefix from a normalized path.
///
/// Returns the remainder as an absolute path (`/` when the path is the
/// prefix itself), or `None` if the path is outside the prefix.
pub fn strip_mount<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix == "/" {
        return Some(path);
    }
    if path == prefix {
        return Some("/");
    }
    match path.strip_prefix(prefix) {
        Some(rest) if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "/")]
    #[case("/", "/")]
    #[case("//", "/")]
    #[case("a", "/a")]
    #[case("/a/", "/a")]
    #[case("a/b/c", "/a/b/c")]
    #[case("/a//b///c/", "/a/b/c")]
    #[case("/a/./b", "/a/b")]
    #[case("/a/b/../c", "/a/c")]
    #[case("/../..", "/")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[rstest]
    #[case("")]
    #[case("cloud/notes/")]
    #[case("/x/../y//z")]
    #[case("///")]
    fn test_normalize_idempotent(#[case] input: &str) {
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_segments() {
        assert!(segments("/").is_empty());
        assert_eq!(segments("/a/b"), vec!["a", "b"]);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/a/b.txt"), "b.txt");
        assert_eq!(file_name("/"), "/");
    }

    #[test]
    fn test_strip_mount() {
        assert_eq!(strip_mount("/cloud", "/cloud"), Some("/"));
        assert_eq!(strip_mount("/cloud/a/b", "/cloud"), Some("/a/b"));
        assert_eq!(strip_mount("/cloudy", "/cloud"), None);
        assert_eq!(strip_mount("/home", "/cloud"), None);
        assert_eq!(strip_mount("/home", "/"), Some("/home"));
    }
}
