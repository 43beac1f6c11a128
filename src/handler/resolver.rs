//! Path resolution module
//!
//! Maps a request URL onto the document root, rejecting traversal and hidden
//! segments before any filesystem probe, and remapping well-known shared
//! filenames to assets bundled with the server.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Well-known basenames served from the server's own assets, independent of
/// the document root.
const SHARED_FILES: &[&str] = &["favicon.svg", "robots.txt"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// A request-derived path segment begins with `.`.
    #[error("hidden path segment")]
    Forbidden,
    /// The normalized path does not exist.
    #[error("path does not exist")]
    NotFound,
}

/// Successful resolution result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Resolve a request path against the document root.
///
/// Normalizes `.`/`..` segments lexically (traversal cannot escape the
/// root), rejects hidden segments before the existence check, and remaps
/// shared basenames to assets under `static_dir`.
pub fn resolve(home: &Path, static_dir: &Path, url_path: &str) -> Result<Resolved, ResolveError> {
    let segments = normalize_segments(url_path);

    // Hidden-segment check comes before existence: /.templates is 403 even
    // when it does not exist
    if segments.iter().any(|s| s.starts_with('.')) {
        return Err(ResolveError::Forbidden);
    }

    let path = match shared_file(static_dir, segments.last()) {
        Some(bundled) => bundled,
        None => {
            let mut p = home.to_path_buf();
            for segment in &segments {
                p.push(segment);
            }
            p
        }
    };

    let Ok(meta) = std::fs::metadata(&path) else {
        return Err(ResolveError::NotFound);
    };

    Ok(Resolved {
        path,
        is_dir: meta.is_dir(),
    })
}

/// Collapse `.` and `..` segments lexically; `..` above the root is dropped.
fn normalize_segments(url_path: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    for segment in url_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
    segments
}

/// Look up the shared asset for a well-known basename.
fn shared_file(static_dir: &Path, basename: Option<&String>) -> Option<PathBuf> {
    let basename = basename?;
    SHARED_FILES
        .iter()
        .find(|name| *name == basename)
        .map(|name| static_dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn assets() -> &'static Path {
        Path::new("/srv/noobhttp/static")
    }

    #[test]
    fn test_hidden_segment_forbidden_regardless_of_existence() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join(".templates")).unwrap();

        assert_eq!(
            resolve(root.path(), assets(), "/.templates"),
            Err(ResolveError::Forbidden)
        );
        assert_eq!(
            resolve(root.path(), assets(), "/.ghost/file"),
            Err(ResolveError::Forbidden)
        );
        assert_eq!(
            resolve(root.path(), assets(), "/sub/.hidden.txt"),
            Err(ResolveError::Forbidden)
        );
    }

    #[test]
    fn test_missing_path_not_found() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve(root.path(), assets(), "/nope.html"),
            Err(ResolveError::NotFound)
        );
    }

    #[test]
    fn test_existing_file_and_directory() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("sub")).unwrap();
        fs::write(root.path().join("sub/index.html"), "hi").unwrap();

        let file = resolve(root.path(), assets(), "/sub/index.html").unwrap();
        assert!(!file.is_dir);
        assert_eq!(file.path, root.path().join("sub/index.html"));

        let dir = resolve(root.path(), assets(), "/sub/").unwrap();
        assert!(dir.is_dir);
    }

    #[test]
    fn test_traversal_cannot_escape_root() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("safe.txt"), "x").unwrap();

        // ../../ collapses back into the root
        let resolved = resolve(root.path(), assets(), "/../../safe.txt").unwrap();
        assert_eq!(resolved.path, root.path().join("safe.txt"));
    }

    #[test]
    fn test_dot_dot_hides_nothing_above_root() {
        let root = tempfile::tempdir().unwrap();
        // /a/../b.txt normalizes to /b.txt
        fs::write(root.path().join("b.txt"), "x").unwrap();
        let resolved = resolve(root.path(), assets(), "/a/../b.txt").unwrap();
        assert_eq!(resolved.path, root.path().join("b.txt"));
    }

    #[test]
    fn test_shared_basename_lookup() {
        assert_eq!(
            shared_file(assets(), Some(&"robots.txt".to_string())),
            Some(assets().join("robots.txt"))
        );
        assert_eq!(shared_file(assets(), Some(&"other.txt".to_string())), None);
        assert_eq!(shared_file(assets(), None), None);
    }

    #[test]
    fn test_shared_assets_anchored_at_configured_dir() {
        // The remap must follow the configured asset dir, not the working
        // directory the process happened to start in
        let root = tempfile::tempdir().unwrap();
        let home = root.path().join("public");
        let static_dir = root.path().join("assets");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(&static_dir).unwrap();
        fs::write(static_dir.join("robots.txt"), "User-agent: *\n").unwrap();

        let resolved = resolve(&home, &static_dir, "/robots.txt").unwrap();
        assert!(!resolved.is_dir);
        assert_eq!(resolved.path, static_dir.join("robots.txt"));
    }
}
