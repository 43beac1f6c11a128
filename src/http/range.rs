//! Byte-range window resolution module
//!
//! Decides the byte window a streamed delivery covers. Files at or below the
//! 1 MiB threshold are buffered by the caller instead of streamed.

/// Files larger than this are delivered in streaming mode.
pub const STREAM_THRESHOLD: u64 = 1024 * 1024;

const ONE_MIB: u64 = 1024 * 1024;

/// Resolved byte window for a streamed response, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamWindow {
    pub start: u64,
    pub end: u64,
}

impl StreamWindow {
    /// Number of bytes the window covers.
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Resolve the delivery window for a file of `size` bytes.
///
/// Default window is the whole file. A `Range: bytes=<start>-<end?>` header
/// narrows it; an absent end defaults to `start + 1 MiB`. When `If-Range` is
/// present and does not equal the current ETag the requested range is stale
/// and the window resets to the first MiB. Returns `None` when the resolved
/// window is inverted (`start > end`); the caller must fail safely.
pub fn resolve_window(
    range: Option<&str>,
    if_range: Option<&str>,
    etag: &str,
    size: u64,
) -> Option<StreamWindow> {
    let mut start = 0;
    let mut end = size.saturating_sub(1);

    if let Some((req_start, req_end)) = parse_range(range) {
        start = req_start;
        end = req_end.unwrap_or(start + ONE_MIB);

        if let Some(validator) = if_range {
            if validator != etag {
                start = 0;
                end = ONE_MIB;
            }
        }

        if start > end {
            return None;
        }
    }

    // Keep Content-Range/Content-Length consistent with what is actually read
    end = end.min(size.saturating_sub(1));

    Some(StreamWindow { start, end })
}

/// Parse a `bytes=<start>-<end?>` header value.
///
/// Anything else (missing header, other units, multi-range, suffix form) is
/// treated as no range at all.
fn parse_range(range: Option<&str>) -> Option<(u64, Option<u64>)> {
    let header = range?.strip_prefix("bytes=")?;

    if header.contains(',') {
        return None;
    }

    let (start_str, end_str) = header.split_once('-')?;

    let start = start_str.trim().parse::<u64>().ok()?;
    let end_str = end_str.trim();
    let end = if end_str.is_empty() {
        None
    } else {
        Some(end_str.parse::<u64>().ok()?)
    };

    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN_MIB: u64 = 10 * 1024 * 1024;

    #[test]
    fn test_no_range_full_window() {
        let w = resolve_window(None, None, "\"e\"", TEN_MIB).unwrap();
        assert_eq!(w.start, 0);
        assert_eq!(w.end, TEN_MIB - 1);
        assert_eq!(w.content_length(), TEN_MIB);
    }

    #[test]
    fn test_explicit_range() {
        let w = resolve_window(Some("bytes=100-199"), None, "\"e\"", TEN_MIB).unwrap();
        assert_eq!(w.start, 100);
        assert_eq!(w.end, 199);
        assert_eq!(w.content_length(), 100);
    }

    #[test]
    fn test_open_range_defaults_to_one_mib_past_start() {
        let w = resolve_window(Some("bytes=500-"), None, "\"e\"", TEN_MIB).unwrap();
        assert_eq!(w.start, 500);
        assert_eq!(w.end, 500 + ONE_MIB);
    }

    #[test]
    fn test_if_range_mismatch_resets_window() {
        let w = resolve_window(Some("bytes=5000-9000"), Some("\"stale\""), "\"current\"", TEN_MIB)
            .unwrap();
        assert_eq!(w.start, 0);
        assert_eq!(w.end, ONE_MIB);
    }

    #[test]
    fn test_if_range_match_keeps_window() {
        let w = resolve_window(Some("bytes=5000-9000"), Some("\"current\""), "\"current\"", TEN_MIB)
            .unwrap();
        assert_eq!(w.start, 5000);
        assert_eq!(w.end, 9000);
    }

    #[test]
    fn test_inverted_range_yields_no_window() {
        assert_eq!(resolve_window(Some("bytes=200-100"), None, "\"e\"", TEN_MIB), None);
    }

    #[test]
    fn test_end_clamped_to_eof() {
        let w = resolve_window(Some("bytes=0-999999999"), None, "\"e\"", 2048).unwrap();
        assert_eq!(w.end, 2047);
    }

    #[test]
    fn test_malformed_range_treated_as_absent() {
        let w = resolve_window(Some("bytes=a-b"), None, "\"e\"", TEN_MIB).unwrap();
        assert_eq!((w.start, w.end), (0, TEN_MIB - 1));
        let w = resolve_window(Some("bytes=0-9,20-29"), None, "\"e\"", TEN_MIB).unwrap();
        assert_eq!((w.start, w.end), (0, TEN_MIB - 1));
    }
}
