//! Rendered-artifact disk cache module
//!
//! Artifacts live under `<cacheRoot>/<host>/<language>/<path-relative-to-home>`.
//! Writes are fire-and-forget; a failed write never fails the in-flight
//! response. Staleness is governed by the source file, not the artifact.

use crate::logger;
use std::path::{Path, PathBuf};

/// Compute the on-disk location of a rendered artifact.
pub fn artifact_path(cache_dir: &Path, host: &str, language: &str, relative: &Path) -> PathBuf {
    cache_dir.join(host).join(language).join(relative)
}

/// Find a trusted artifact for the request.
///
/// An artifact is only trusted if it exists and the client did not force
/// revalidation with `Cache-Control: no-cache`.
pub fn lookup(
    cache_dir: &Path,
    host: &str,
    language: &str,
    relative: &Path,
    no_cache: bool,
) -> Option<PathBuf> {
    if no_cache {
        return None;
    }
    let path = artifact_path(cache_dir, host, language, relative);
    path.is_file().then_some(path)
}

/// Persist a rendered artifact asynchronously.
///
/// Intermediate directories are created as needed. Concurrent writers for
/// the same artifact race benignly: identical content, last writer wins.
pub fn persist(path: PathBuf, content: String) {
    tokio::spawn(async move {
        if let Some(parent) = path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                logger::log_cache_persist_failed(&path, &err);
                return;
            }
        }
        if let Err(err) = tokio::fs::write(&path, content).await {
            logger::log_cache_persist_failed(&path, &err);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path_layout() {
        let path = artifact_path(
            Path::new("/tmp/cache"),
            "example.com:8080",
            "en",
            Path::new("sub/index.html"),
        );
        assert_eq!(
            path,
            Path::new("/tmp/cache/example.com:8080/en/sub/index.html")
        );
    }

    #[test]
    fn test_lookup_distrusts_no_cache() {
        let root = tempfile::tempdir().unwrap();
        let rel = Path::new("index.html");
        let artifact = artifact_path(root.path(), "h", "en", rel);
        std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        std::fs::write(&artifact, "rendered").unwrap();

        assert_eq!(lookup(root.path(), "h", "en", rel, false), Some(artifact));
        assert_eq!(lookup(root.path(), "h", "en", rel, true), None);
    }

    #[test]
    fn test_lookup_missing_artifact() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(lookup(root.path(), "h", "en", Path::new("x.html"), false), None);
    }

    #[tokio::test]
    async fn test_persist_creates_directories() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("host/en/deep/page.html");
        persist(path.clone(), "content".to_string());

        // Fire-and-forget: poll until the background write lands
        for _ in 0..50 {
            if path.is_file() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }
}
