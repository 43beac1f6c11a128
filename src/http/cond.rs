//! Conditional cache evaluation module
//!
//! Computes the cache-validation header set for an artifact and decides
//! whether a 304 can replace a full body transfer.

use chrono::{DateTime, Duration, Utc};
use std::io;

/// Source of truth for ETag and Expires computation.
///
/// Read fresh per request, either from the source file or from a trusted
/// cache artifact.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    /// Inode number; stable only within a single filesystem.
    pub inode: u64,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

impl FileStat {
    /// Build a stat snapshot from filesystem metadata.
    pub fn from_metadata(meta: &std::fs::Metadata) -> io::Result<Self> {
        #[cfg(unix)]
        let inode = std::os::unix::fs::MetadataExt::ino(meta);
        #[cfg(not(unix))]
        let inode = 0;

        Ok(Self {
            inode,
            size: meta.len(),
            modified: DateTime::<Utc>::from(meta.modified()?),
        })
    }

    /// Modification time as epoch milliseconds, the ETag granularity.
    pub fn mtime_millis(&self) -> i64 {
        self.modified.timestamp_millis()
    }
}

/// Format a timestamp as an HTTP date (RFC 7231 IMF-fixdate).
pub fn http_date(t: DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Compute the quoted ETag `"(inode)-(size)-(mtime-millis)"` for a stat.
pub fn compute_etag(stat: &FileStat) -> String {
    format!("\"{}-{}-{}\"", stat.inode, stat.size, stat.mtime_millis())
}

/// Validation header set applied to the response before any further decision.
#[derive(Debug, Clone)]
pub struct CacheHeaders {
    pub last_modified: String,
    pub etag: String,
    pub expires: String,
    pub content_length: u64,
}

impl CacheHeaders {
    /// Compute the header set for an artifact stat.
    ///
    /// `Expires` is the artifact mtime plus `cache_days` whole days.
    pub fn for_stat(stat: &FileStat, cache_days: i64) -> Self {
        Self {
            last_modified: http_date(stat.modified),
            etag: compute_etag(stat),
            expires: http_date(stat.modified + Duration::days(cache_days)),
            content_length: stat.size,
        }
    }

    /// Replace freshness fields for a just-rendered artifact: rendered output
    /// is considered fresh for `cache_days` from the moment it was generated,
    /// not from the source mtime.
    pub fn refresh_for_render(&mut self, rendered_at: DateTime<Utc>, cache_days: i64, content_length: u64) {
        self.last_modified = http_date(rendered_at);
        self.expires = http_date(rendered_at + Duration::days(cache_days));
        self.content_length = content_length;
    }
}

/// Outcome of the conditional-cache decision procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Client copy is current; 304 with no body.
    NotModified,
    /// Deliver the artifact.
    Serve,
}

/// Decide between 304 and full delivery for the given request headers.
///
/// `If-Modified-Since` wins when its parsed time is at or after the artifact
/// mtime, compared at whole seconds (`Last-Modified` carries no sub-second
/// part, so a client echoing it back must revalidate); otherwise
/// `If-None-Match` must equal the computed ETag exactly, quotes included.
pub fn evaluate(
    stat: &FileStat,
    etag: &str,
    if_modified_since: Option<&str>,
    if_none_match: Option<&str>,
) -> CacheDecision {
    if let Some(since) = if_modified_since {
        if let Ok(parsed) = DateTime::parse_from_rfc2822(since) {
            if parsed.timestamp() >= stat.modified.timestamp() {
                return CacheDecision::NotModified;
            }
        }
    }

    if if_none_match == Some(etag) {
        return CacheDecision::NotModified;
    }

    CacheDecision::Serve
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stat_at(secs: i64) -> FileStat {
        FileStat {
            inode: 42,
            size: 1234,
            modified: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_etag_format() {
        let stat = stat_at(1_700_000_000);
        assert_eq!(compute_etag(&stat), "\"42-1234-1700000000000\"");
    }

    #[test]
    fn test_http_date_format() {
        let t = Utc.with_ymd_and_hms(1994, 11, 15, 8, 12, 31).unwrap();
        assert_eq!(http_date(t), "Tue, 15 Nov 1994 08:12:31 GMT");
    }

    #[test]
    fn test_expires_whole_days() {
        let stat = stat_at(1_700_000_000);
        let headers = CacheHeaders::for_stat(&stat, 2);
        let expires = DateTime::parse_from_rfc2822(&headers.expires).unwrap();
        let last_modified = DateTime::parse_from_rfc2822(&headers.last_modified).unwrap();
        assert_eq!(expires - last_modified, Duration::days(2));
    }

    #[test]
    fn test_if_modified_since_at_or_after_mtime() {
        let stat = stat_at(784_887_151);
        let etag = compute_etag(&stat);
        // Exactly the mtime
        assert_eq!(
            evaluate(&stat, &etag, Some("Tue, 15 Nov 1994 08:12:31 GMT"), None),
            CacheDecision::NotModified
        );
        // One second before the mtime
        assert_eq!(
            evaluate(&stat, &etag, Some("Tue, 15 Nov 1994 08:12:30 GMT"), None),
            CacheDecision::Serve
        );
    }

    #[test]
    fn test_if_modified_since_roundtrip_with_subsecond_mtime() {
        // Real files carry sub-second mtimes; a client echoing back the
        // served Last-Modified (whole seconds) must still get a 304
        let stat = FileStat {
            inode: 42,
            size: 1234,
            modified: Utc.timestamp_opt(784_887_151, 500_000_000).unwrap(),
        };
        let etag = compute_etag(&stat);
        let last_modified = http_date(stat.modified);
        assert_eq!(
            evaluate(&stat, &etag, Some(&last_modified), None),
            CacheDecision::NotModified
        );
    }

    #[test]
    fn test_if_none_match_exact() {
        let stat = stat_at(1_700_000_000);
        let etag = compute_etag(&stat);
        assert_eq!(
            evaluate(&stat, &etag, None, Some(etag.as_str())),
            CacheDecision::NotModified
        );
        // Unquoted value must not match
        assert_eq!(
            evaluate(&stat, &etag, None, Some("42-1234-1700000000000")),
            CacheDecision::Serve
        );
        assert_eq!(evaluate(&stat, &etag, None, None), CacheDecision::Serve);
    }

    #[test]
    fn test_malformed_if_modified_since_is_ignored() {
        let stat = stat_at(1_700_000_000);
        let etag = compute_etag(&stat);
        assert_eq!(
            evaluate(&stat, &etag, Some("not a date"), None),
            CacheDecision::Serve
        );
    }
}
