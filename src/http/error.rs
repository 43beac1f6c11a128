//! Error response building module
//!
//! Builders for the error status codes the pipeline surfaces. Every error
//! response carries `Content-Type: text/plain`, an explicit `Content-Length`
//! and a short human-readable body.

use super::{empty_body, full_body, Body};
use crate::logger;
use hyper::Response;

/// Body text for a surfaced error code.
pub fn error_text(code: u16) -> &'static str {
    match code {
        401 => "Authentication required",
        403 => "Forbidden",
        404 => "File Not Found",
        405 => "Method Not Allowed",
        501 => "Not Implemented",
        _ => "Internal Error",
    }
}

/// Build a plain-text error response for the given status code.
pub fn build_error_response(code: u16) -> Response<Body> {
    let text = error_text(code);
    Response::builder()
        .status(code)
        .header("Content-Type", "text/plain")
        .header("Content-Length", text.len())
        .body(full_body(text))
        .unwrap_or_else(|e| {
            log_build_error(code, &e);
            Response::new(full_body(text))
        })
}

/// Build a 401 response demanding basic authentication for `realm`.
pub fn build_unauthorized_response(realm: &str) -> Response<Body> {
    let text = error_text(401);
    Response::builder()
        .status(401)
        .header("Content-Type", "text/plain")
        .header("Content-Length", text.len())
        .header("WWW-Authenticate", format!("Basic realm=\"{realm}\""))
        .body(full_body(text))
        .unwrap_or_else(|e| {
            log_build_error(401, &e);
            Response::new(full_body(text))
        })
}

/// Build a 405 response for a static file (only GET/HEAD are supported).
pub fn build_method_not_allowed_response() -> Response<Body> {
    let text = error_text(405);
    Response::builder()
        .status(405)
        .header("Content-Type", "text/plain")
        .header("Content-Length", text.len())
        .header("Allow", "GET, HEAD, OPTIONS")
        .body(full_body(text))
        .unwrap_or_else(|e| {
            log_build_error(405, &e);
            Response::new(full_body(text))
        })
}

/// Build a 200 response with no body and an `Allow` list (OPTIONS requests).
pub fn build_options_response(allow: &str) -> Response<Body> {
    Response::builder()
        .status(200)
        .header("Content-Length", 0)
        .header("Allow", allow)
        .body(empty_body())
        .unwrap_or_else(|e| {
            log_build_error(200, &e);
            Response::new(empty_body())
        })
}

/// Log response build error
fn log_build_error(status: u16, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_texts() {
        assert_eq!(error_text(403), "Forbidden");
        assert_eq!(error_text(404), "File Not Found");
        assert_eq!(error_text(405), "Method Not Allowed");
        assert_eq!(error_text(500), "Internal Error");
        assert_eq!(error_text(501), "Not Implemented");
    }

    #[test]
    fn test_error_response_headers() {
        let resp = build_error_response(404);
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.headers()["Content-Type"], "text/plain");
        assert_eq!(resp.headers()["Content-Length"], "14");
    }

    #[test]
    fn test_unauthorized_realm() {
        let resp = build_unauthorized_response("Noob Realm");
        assert_eq!(resp.status(), 401);
        assert_eq!(resp.headers()["WWW-Authenticate"], "Basic realm=\"Noob Realm\"");
    }

    #[test]
    fn test_options_allow() {
        let resp = build_options_response("OPTIONS, POST, DELETE");
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Allow"], "OPTIONS, POST, DELETE");
        assert_eq!(resp.headers()["Content-Length"], "0");
    }
}
