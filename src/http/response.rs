//! HTTP response building module
//!
//! Builders for successful deliveries: buffered 200s, 304s and streamed 206
//! partial content, all over the shared [`Body`] type.

use super::cond::CacheHeaders;
use super::range::StreamWindow;
use super::{empty_body, full_body, Body};
use crate::logger;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::Response;
use std::io::{self, SeekFrom};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// Pseudo-header written ahead of a mid-stream FLV range so seeking stays
/// playable: "FLV", version 1, flags 5, header size 9, previous tag size 9.
const FLV_PREAMBLE: &[u8] = b"FLV\x01\x05\x00\x00\x00\x09\x00\x00\x00\x09";

const STREAM_CHUNK: usize = 64 * 1024;

/// Apply the cache-validation header set to a response builder.
fn apply_cache_headers(
    builder: hyper::http::response::Builder,
    headers: &CacheHeaders,
) -> hyper::http::response::Builder {
    builder
        .header("Last-Modified", &headers.last_modified)
        .header("ETag", &headers.etag)
        .header("Expires", &headers.expires)
        .header("Cache-Control", "public, must-revalidate")
        .header("Accept-Ranges", "bytes")
}

/// Build a 304 Not Modified response.
///
/// The validation headers are still emitted so the client can refresh its
/// cached metadata.
pub fn build_not_modified_response(headers: &CacheHeaders) -> Response<Body> {
    apply_cache_headers(Response::builder().status(304), headers)
        .header("Content-Length", headers.content_length)
        .body(empty_body())
        .unwrap_or_else(|e| {
            log_build_error(304, &e);
            Response::new(empty_body())
        })
}

/// Build a buffered 200 response with cache-validation headers.
pub fn build_file_response(
    data: Bytes,
    content_type: &str,
    headers: &CacheHeaders,
    is_head: bool,
) -> Response<Body> {
    let body = if is_head { empty_body() } else { full_body(data) };

    apply_cache_headers(Response::builder().status(200), headers)
        .header("Content-Type", content_type)
        .header("Content-Length", headers.content_length)
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error(200, &e);
            Response::new(empty_body())
        })
}

/// Build a streamed 206 Partial Content response for the given window.
pub fn build_partial_response(
    body: Body,
    content_type: &str,
    headers: &CacheHeaders,
    window: StreamWindow,
    total_size: u64,
    filename: &str,
) -> Response<Body> {
    apply_cache_headers(Response::builder().status(206), headers)
        .header("Content-Type", content_type)
        .header("Content-Length", window.content_length())
        .header(
            "Content-Range",
            format!("bytes {}-{}/{total_size}", window.start, window.end),
        )
        .header("Content-Disposition", format!("inline; filename={filename};"))
        .header("Connection", "keep-alive")
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error(206, &e);
            Response::new(empty_body())
        })
}

/// Open `path` and produce a streamed body covering `window`.
///
/// For `video/x-flv` content with a non-zero start offset the FLV preamble is
/// chained ahead of the byte range.
pub async fn open_range_body(
    path: &Path,
    window: StreamWindow,
    content_type: &str,
) -> io::Result<Body> {
    let mut file = File::open(path).await?;
    file.seek(SeekFrom::Start(window.start)).await?;
    let reader = file.take(window.content_length());

    let preamble = if content_type == "video/x-flv" && window.start > 0 {
        Some(Ok(Frame::data(Bytes::from_static(FLV_PREAMBLE))))
    } else {
        None
    };

    let frames = ReaderStream::with_capacity(reader, STREAM_CHUNK).map_ok(Frame::data);
    let body = StreamBody::new(stream::iter(preamble).chain(frames));

    // Both BodyExt and StreamExt provide a `boxed`; we want the body one
    Ok(BodyExt::boxed(body))
}

/// Log response build error
fn log_build_error(status: u16, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}
