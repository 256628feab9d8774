//! Normalized relative paths
//!
//! Every tracked file is identified by its path relative to the watched
//! root, written with forward slashes on all platforms. That normalized
//! string is the identity used for shadow keying, journal rows, and
//! per-path locking, so it must be produced the same way everywhere.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Validation failures for relative path strings.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path is absolute: {0}")]
    Absolute(String),
    #[error("path escapes the watched root: {0}")]
    Traversal(String),
}

/// A file path relative to the watched root, normalized to forward slashes
/// with no `.` or `..` segments.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelPath(String);

impl RelPath {
    /// Validate and normalize a relative path string.
    ///
    /// Backslashes are unified to forward slashes, empty and `.` segments
    /// are dropped, and `..` segments are rejected outright.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PathError> {
        let raw = raw.as_ref();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        let unified = raw.replace('\\', "/");
        if unified.starts_with('/') {
            return Err(PathError::Absolute(raw.to_string()));
        }
        let mut parts = Vec::new();
        for part in unified.split('/') {
            match part {
                "" | "." => continue,
                ".." => return Err(PathError::Traversal(raw.to_string())),
                other => parts.push(other),
            }
        }
        if parts.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(parts.join("/")))
    }

    /// Relativize `abs` against `root`.
    ///
    /// Returns `None` when `abs` does not live under `root`, is the root
    /// itself, or has components that cannot be represented as UTF-8.
    /// Paths outside the root are not errors; they are simply not ours.
    pub fn under(root: &Path, abs: &Path) -> Option<Self> {
        let rel = abs.strip_prefix(root).ok()?;
        let mut parts = Vec::new();
        for comp in rel.components() {
            match comp {
                Component::Normal(os) => parts.push(os.to_str()?),
                Component::CurDir => continue,
                _ => return None,
            }
        }
        if parts.is_empty() {
            return None;
        }
        Some(Self(parts.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path joined back under `root` as an OS path.
    pub fn to_absolute(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for part in self.0.split('/') {
            out.push(part);
        }
        out
    }

    /// Path segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Final segment (the file name).
    pub fn file_name(&self) -> &str {
        match self.0.rsplit('/').next() {
            Some(name) => name,
            None => &self.0,
        }
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelPath({})", self.0)
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_separators() {
        let p = RelPath::new("src\\main.rs").unwrap();
        assert_eq!(p.as_str(), "src/main.rs");
    }

    #[test]
    fn test_new_drops_dot_segments() {
        let p = RelPath::new("./src//./lib.rs").unwrap();
        assert_eq!(p.as_str(), "src/lib.rs");
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(RelPath::new(""), Err(PathError::Empty)));
        assert!(matches!(RelPath::new("./."), Err(PathError::Empty)));
    }

    #[test]
    fn test_new_rejects_absolute() {
        assert!(matches!(
            RelPath::new("/etc/passwd"),
            Err(PathError::Absolute(_))
        ));
    }

    #[test]
    fn test_new_rejects_traversal() {
        assert!(matches!(
            RelPath::new("src/../../etc/passwd"),
            Err(PathError::Traversal(_))
        ));
    }

    #[test]
    fn test_under_root() {
        let root = Path::new("/watch/here");
        let abs = Path::new("/watch/here/src/main.go");
        let p = RelPath::under(root, abs).unwrap();
        assert_eq!(p.as_str(), "src/main.go");
    }

    #[test]
    fn test_under_rejects_outside_root() {
        let root = Path::new("/watch/here");
        assert!(RelPath::under(root, Path::new("/elsewhere/file")).is_none());
        assert!(RelPath::under(root, Path::new("/watch/here")).is_none());
    }

    #[test]
    fn test_to_absolute_roundtrip() {
        let root = Path::new("/watch/here");
        let p = RelPath::new("a/b/c.txt").unwrap();
        let abs = p.to_absolute(root);
        assert_eq!(RelPath::under(root, &abs).unwrap(), p);
    }

    #[test]
    fn test_segments_and_file_name() {
        let p = RelPath::new("a/b/c.txt").unwrap();
        assert_eq!(p.segments().collect::<Vec<_>>(), vec!["a", "b", "c.txt"]);
        assert_eq!(p.file_name(), "c.txt");

        let single = RelPath::new("top.txt").unwrap();
        assert_eq!(single.file_name(), "top.txt");
    }
}
