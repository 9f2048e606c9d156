//! Normalized tree path value object.
//!
//! A [`TreePath`] always starts and ends with a slash, regardless of how the
//! caller spelled the incoming path. All derived forms (URL form, root-joined
//! forms, breadcrumbs) are pure functions of the normalized string.

use std::fmt;
use std::path::{Path, PathBuf};

/// A normalized path inside the served tree.
///
/// Construction never fails: missing leading/trailing slashes are added and
/// nothing else is touched. In particular `.` and `..` segments pass through
/// unchanged, so callers embedding this in a security boundary must apply
/// their own traversal policy on top.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreePath {
    path: String,
}

impl TreePath {
    /// Normalize a raw path: prepend `/` if missing, append `/` if missing.
    pub fn new(raw: &str) -> Self {
        let mut path = String::with_capacity(raw.len() + 2);
        if !raw.starts_with('/') {
            path.push('/');
        }
        path.push_str(raw);
        if !path.ends_with('/') {
            path.push('/');
        }
        Self { path }
    }

    /// The full path. Always starts and ends with `/`.
    pub fn full_path(&self) -> &str {
        &self.path
    }

    /// Same as [`full_path`](Self::full_path) with the leading `/` stripped,
    /// suitable for embedding in a URL after a route prefix.
    pub fn for_url(&self) -> &str {
        &self.path[1..]
    }

    /// Prefix the backend root (an FTP base directory or a drive-style
    /// label) onto the full path.
    pub fn with_root(&self, root: &str) -> String {
        format!("{}{}", root, self.path)
    }

    /// Resolve this path under a local filesystem root.
    ///
    /// The trailing separator is dropped so the result is valid for file
    /// operations (`open("x.txt/")` fails on most platforms).
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let relative = self.path.trim_matches('/');
        if relative.is_empty() {
            root.to_path_buf()
        } else {
            root.join(relative)
        }
    }

    /// The final path segment, used as the attachment file name for
    /// downloads. Falls back to `/` for the root path.
    pub fn file_name(&self) -> &str {
        self.path
            .split('/')
            .rev()
            .find(|segment| !segment.is_empty())
            .unwrap_or("/")
    }

    /// Iterate over `(segment, cumulative_path)` pairs from the root down to
    /// this path.
    ///
    /// For `/A/B/C/` this yields `("A", "/A/")`, `("B", "/A/B/")`,
    /// `("C", "/A/B/C/")` in that order. The iterator is a pure function of
    /// the path and can be restarted freely.
    pub fn breadcrumbs(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .scan(String::from("/"), |cumulative, segment| {
                cumulative.push_str(segment);
                cumulative.push('/');
                Some((segment.to_string(), cumulative.clone()))
            })
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_both_slashes() {
        assert_eq!(TreePath::new("A/B").full_path(), "/A/B/");
        assert_eq!(TreePath::new("/A/B").full_path(), "/A/B/");
        assert_eq!(TreePath::new("A/B/").full_path(), "/A/B/");
        assert_eq!(TreePath::new("/A/B/").full_path(), "/A/B/");
    }

    #[test]
    fn test_normalize_empty_and_root() {
        assert_eq!(TreePath::new("").full_path(), "/");
        assert_eq!(TreePath::new("/").full_path(), "/");
    }

    #[test]
    fn test_normalize_always_slash_delimited() {
        for raw in ["movies", "a/b/c", "/x", "x/", "..", "."] {
            let path = TreePath::new(raw);
            assert!(path.full_path().starts_with('/'), "input {raw:?}");
            assert!(path.full_path().ends_with('/'), "input {raw:?}");
        }
    }

    #[test]
    fn test_for_url_strips_leading_slash() {
        assert_eq!(TreePath::new("/A/B/").for_url(), "A/B/");
        assert_eq!(TreePath::new("").for_url(), "");
    }

    #[test]
    fn test_with_root() {
        assert_eq!(TreePath::new("A/B").with_root("/srv/media"), "/srv/media/A/B/");
        assert_eq!(TreePath::new("clips").with_root(""), "/clips/");
    }

    #[test]
    fn test_to_fs_path() {
        let root = Path::new("/data");
        assert_eq!(TreePath::new("A/B.mp4").to_fs_path(root), PathBuf::from("/data/A/B.mp4"));
        assert_eq!(TreePath::new("/").to_fs_path(root), PathBuf::from("/data"));
        assert_eq!(TreePath::new("").to_fs_path(root), PathBuf::from("/data"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(TreePath::new("A/B.mp4").file_name(), "B.mp4");
        assert_eq!(TreePath::new("C.mkv").file_name(), "C.mkv");
        assert_eq!(TreePath::new("/").file_name(), "/");
    }

    #[test]
    fn test_breadcrumbs_exact_sequence() {
        let path = TreePath::new("/A/B/C/");
        let crumbs: Vec<(String, String)> = path.breadcrumbs().collect();
        assert_eq!(
            crumbs,
            vec![
                ("A".to_string(), "/A/".to_string()),
                ("B".to_string(), "/A/B/".to_string()),
                ("C".to_string(), "/A/B/C/".to_string()),
            ]
        );
    }

    #[test]
    fn test_breadcrumbs_root_is_empty() {
        assert_eq!(TreePath::new("/").breadcrumbs().count(), 0);
    }

    #[test]
    fn test_breadcrumbs_restartable() {
        let path = TreePath::new("/A/B/");
        let first: Vec<_> = path.breadcrumbs().collect();
        let second: Vec<_> = path.breadcrumbs().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_traversal_segments_pass_through() {
        // No sanitization by contract; the boundary layer owns that policy.
        assert_eq!(TreePath::new("../secret").full_path(), "/../secret/");
    }
}
