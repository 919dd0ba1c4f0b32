//! Path normalization utilities.
//!
//! Provides consistent path handling across the codebase:
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `resolve_path` - resolve relative paths against a base directory
//! - `lexical_normalize` - fold `.` and `..` without touching the filesystem
//! - `is_within` - containment check used to keep patches inside source roots

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to lexical normalization of the absolute path when the file
/// does not exist yet.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        };
        lexical_normalize(&absolute)
    })
}

/// Resolve a path that may be relative to a base directory.
///
/// Always returns a normalized absolute path:
/// 1. If absolute, normalize as-is
/// 2. Otherwise, resolve relative to `base`
#[inline]
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_path(path);
    }
    normalize_path(&base.join(path))
}

/// Fold `.` and `..` components without filesystem access.
///
/// `..` at the root is dropped, so the result never climbs above it.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let climbs = out.components().next_back() == Some(Component::ParentDir);
                if climbs || (!out.pop() && !out.has_root()) {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Check whether `path` lies inside `root` (both normalized first).
pub fn is_within(path: &Path, root: &Path) -> bool {
    normalize_path(path).starts_with(normalize_path(root))
}

/// Path relative to `base` for display, or the path itself if outside.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path_relative() {
        let normalized = normalize_path(Path::new("relative/path/file.txt"));
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_lexical_normalize() {
        assert_eq!(
            lexical_normalize(Path::new("/a/b/../c/./d.html")),
            PathBuf::from("/a/c/d.html")
        );
        assert_eq!(
            lexical_normalize(Path::new("/a/../../etc/passwd")),
            PathBuf::from("/etc/passwd")
        );
    }

    #[test]
    fn test_resolve_path_relative_to_base() {
        let dir = TempDir::new().unwrap();
        let base = normalize_path(dir.path());
        std::fs::create_dir_all(base.join("views")).unwrap();
        std::fs::write(base.join("views/home.html"), "<p>x</p>").unwrap();

        let resolved = resolve_path(Path::new("views/home.html"), &base);
        assert_eq!(resolved, base.join("views/home.html"));
    }

    #[test]
    fn test_is_within_rejects_escape() {
        let dir = TempDir::new().unwrap();
        let root = normalize_path(dir.path()).join("views");
        std::fs::create_dir_all(&root).unwrap();

        assert!(is_within(&root.join("page.html"), &root));
        assert!(!is_within(&root.join("../secret.env"), &root));
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to(Path::new("/site/views/a.html"), Path::new("/site")),
            PathBuf::from("views/a.html")
        );
        assert_eq!(
            relative_to(Path::new("/other/a.html"), Path::new("/site")),
            PathBuf::from("/other/a.html")
        );
    }
}
