//! Ancestor template crawler module
//!
//! Walks parent directories of a rendered document collecting `.templates`
//! and `.i18n` marker directories, closest-first, bounded by depth and by the
//! document root.

use std::path::{Path, PathBuf};

/// Maximum number of parent hops before the crawl gives up.
pub const MAX_CRAWL_DEPTH: usize = 10;

/// Ordered search roots produced by the crawl, closest ancestor first.
#[derive(Debug, Clone, Default)]
pub struct TemplateSearchPaths {
    pub templates: Vec<PathBuf>,
    pub i18n: Vec<PathBuf>,
}

/// Crawl ancestors of `document` up to the parent of `home` or
/// [`MAX_CRAWL_DEPTH`] hops, whichever comes first.
///
/// A document path with an extension starts the crawl at its containing
/// directory; a directory path starts at itself.
pub fn crawl(home: &Path, document: &Path) -> TemplateSearchPaths {
    let mut paths = TemplateSearchPaths::default();

    let mut current: PathBuf = if document.extension().is_some() {
        match document.parent() {
            Some(dir) => dir.to_path_buf(),
            None => return paths,
        }
    } else {
        document.to_path_buf()
    };

    let stop = home.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut hops = 0;
    while current != stop && hops < MAX_CRAWL_DEPTH {
        let templates = current.join(".templates");
        if templates.is_dir() {
            paths.templates.push(templates);
        }
        let i18n = current.join(".i18n");
        if i18n.is_dir() {
            paths.i18n.push(i18n);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
        hops += 1;
    }

    paths
}
