//! HTTP protocol layer module
//!
//! Conditional-cache evaluation, byte-range windows, MIME lookup and response
//! builders, decoupled from request routing.

pub mod cond;
pub mod error;
pub mod mime;
pub mod range;
pub mod response;

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;

/// Response body shared by buffered and streamed deliveries.
pub type Body = BoxBody<Bytes, std::io::Error>;

/// Wrap a fully buffered payload as a [`Body`].
pub fn full_body(data: impl Into<Bytes>) -> Body {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

/// An empty [`Body`] for HEAD, 304 and OPTIONS responses.
pub fn empty_body() -> Body {
    Empty::new().map_err(|never| match never {}).boxed()
}

// Re-export commonly used items
pub use cond::{CacheDecision, CacheHeaders, FileStat};
pub use error::build_error_response;
pub use range::{resolve_window, StreamWindow, STREAM_THRESHOLD};
