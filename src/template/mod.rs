//! Template engine module
//!
//! Resolves `include` and `layout` directives against ancestor `.templates`
//! directories and persists rendered output to the disk cache.

pub mod cache;
pub mod crawl;
pub mod tags;

use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};

pub use crawl::TemplateSearchPaths;
pub use tags::{clean_content, parse_options, ParsedOptions};

/// Request-scoped inputs for one render.
#[derive(Debug, Clone, Copy)]
pub struct RenderMeta<'a> {
    /// Configured document root.
    pub home: &'a Path,
    /// Source file the body came from.
    pub file: &'a Path,
    /// Host header, cache key component.
    pub host: &'a str,
    /// Negotiated language, cache key component.
    pub language: &'a str,
}

/// Result of a render pass.
#[derive(Debug)]
pub enum RenderOutcome {
    /// No tags in the source; body passes through untouched and uncached.
    Unchanged,
    /// Composed output; freshness reflects render time, not source mtime.
    Rendered {
        body: String,
        rendered_at: DateTime<Utc>,
        expires: DateTime<Utc>,
    },
}

/// Include/layout composition engine with a disk-backed artifact cache.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    cache_dir: PathBuf,
    cache_days: i64,
}

impl TemplateEngine {
    pub fn new(cache_dir: PathBuf, cache_days: i64) -> Self {
        Self {
            cache_dir,
            cache_days,
        }
    }

    /// Render a document body.
    ///
    /// Tag-free bodies return [`RenderOutcome::Unchanged`] without touching
    /// the cache. Otherwise: substitute every `include` occurrence with the
    /// nearest ancestor's file, strip remaining non-include tags, wrap in
    /// `layout.html` when a `layout` tag is present, then persist the final
    /// output asynchronously.
    pub fn render(&self, source: &str, meta: &RenderMeta<'_>) -> RenderOutcome {
        if !tags::has_tags(source) {
            return RenderOutcome::Unchanged;
        }

        let rendered_at = Utc::now();
        let expires = rendered_at + Duration::days(self.cache_days);

        let paths = crawl::crawl(meta.home, meta.file);
        let options = parse_options(source);
        let mut content = clean_content(source, &options);

        for include in options.matches("include") {
            let resolved = include_file(
                &paths,
                include.text_option("file").unwrap_or_default(),
            );
            content = content.replacen(&include.raw, &resolved, 1);
        }

        if options.contains("layout") {
            let layout = include_file(&paths, "layout.html");
            if !layout.is_empty() {
                let layout_options = parse_options(&layout);
                let mut wrapped = layout;
                if let Some(content_tag) = layout_options.matches("content").first() {
                    wrapped = wrapped.replacen(&content_tag.raw, &content, 1);
                }
                wrapped = clean_content(&wrapped, &layout_options);

                self.persist(meta, &wrapped);
                return RenderOutcome::Rendered {
                    body: wrapped,
                    rendered_at,
                    expires,
                };
            }
        }

        self.persist(meta, &content);
        RenderOutcome::Rendered {
            body: content,
            rendered_at,
            expires,
        }
    }

    fn persist(&self, meta: &RenderMeta<'_>, body: &str) {
        // Shared files resolve outside the document root; those never cache
        let Ok(relative) = meta.file.strip_prefix(meta.home) else {
            return;
        };
        let path = cache::artifact_path(&self.cache_dir, meta.host, meta.language, relative);
        cache::persist(path, body.to_string());
    }
}

/// Resolve `filename` against the template search roots, closest ancestor
/// first; the first directory containing the file wins.
///
/// The loaded content has its own `include` tags resolved recursively, and
/// its non-include tags stripped unless the requested file is literally
/// `layout.html` (the layout's tags are consumed by the caller's content
/// pass). Returns an empty string when no ancestor provides the file.
fn include_file(paths: &TemplateSearchPaths, filename: &str) -> String {
    if filename.is_empty() {
        return String::new();
    }

    let Some(content) = paths
        .templates
        .iter()
        .find_map(|dir| std::fs::read_to_string(dir.join(filename)).ok())
    else {
        return String::new();
    };

    let options = parse_options(&content);
    let mut resolved = content;

    for include in options.matches("include") {
        let nested = include_file(paths, include.text_option("file").unwrap_or_default());
        resolved = resolved.replacen(&include.raw, &nested, 1);
    }

    if filename == "layout.html" {
        return resolved;
    }

    clean_content(&resolved, &options)
}
