//! Request routing module
//!
//! The full request pipeline: path normalization, language negotiation,
//! lifecycle events, static resolution, dynamic dispatch, basic-auth gating,
//! conditional caching, template rendering and streamed range delivery.

use super::dynamic::{self, DynamicRequest, HandlerLoader, HandlerRegistry, RegistryLoader};
use super::events::ServerEvents;
use super::lang::{self, LANG_COOKIE};
use super::resolver::{self, ResolveError};
use crate::config::Config;
use crate::http::{
    self, cond, error, mime, response, Body, CacheDecision, CacheHeaders, FileStat,
};
use crate::logger;
use crate::template::{RenderMeta, RenderOutcome, TemplateEngine};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use http_body_util::BodyExt;
use hyper::body::{Bytes, Incoming};
use hyper::header::{
    HeaderName, HeaderValue, ACCEPT_LANGUAGE, AUTHORIZATION, CACHE_CONTROL, COOKIE, HOST,
    IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE, RANGE, SERVER,
};
use hyper::{HeaderMap, Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Basic-auth state carried through the pipeline.
///
/// A request observer flips `required` on to gate a request; the router then
/// demands credentials unless `authorized` is already set.
#[derive(Debug, Clone)]
pub struct AuthState {
    pub realm: String,
    pub required: bool,
    pub authorized: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            realm: "Noob Realm".to_string(),
            required: false,
            authorized: false,
        }
    }
}

/// Mutable view of one request, handed to lifecycle observers.
#[derive(Debug)]
pub struct RequestContext {
    /// Configured document root.
    pub home: PathBuf,
    /// `host/method+path` access-log key.
    pub event_key: String,
    pub method: Method,
    /// Normalized request path (trailing `/` appended for extensionless
    /// paths).
    pub path: String,
    /// Host header, port included.
    pub host: String,
    /// Negotiated response language.
    pub language: String,
    /// Fully buffered request body.
    pub body: Vec<u8>,
    pub auth: AuthState,
    pub peer: SocketAddr,
    /// Error code surfaced to the client, when any.
    pub error: Option<u16>,
    /// Filesystem path the response body came from, when any.
    pub response_file: Option<PathBuf>,
}

/// Shared server state: one instance serves every connection.
pub struct AppState {
    pub config: Config,
    pub events: ServerEvents,
    pub handlers: HandlerRegistry,
    pub engine: TemplateEngine,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_loader(config, Box::new(RegistryLoader::new()))
    }

    pub fn with_loader(config: Config, loader: Box<dyn HandlerLoader>) -> Self {
        let engine = TemplateEngine::new(config.cache_dir(), config.cache.days);
        Self {
            config,
            events: ServerEvents::default(),
            handlers: HandlerRegistry::new(loader),
            engine,
        }
    }
}

/// Hyper service entry point: buffer the request body, then run the pipeline.
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<Body>, Infallible> {
    let (parts, incoming) = req.into_parts();
    let body = match incoming.collect().await {
        Ok(collected) => collected.to_bytes().to_vec(),
        Err(err) => {
            logger::log_error(&format!("Failed to read request body: {err}"));
            return Ok(error::build_error_response(500));
        }
    };

    let target = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);

    Ok(process(&state, parts.method, &target, &parts.headers, body, peer).await)
}

/// Run the pipeline for one buffered request. Test entry point.
pub async fn process(
    state: &AppState,
    method: Method,
    target: &str,
    headers: &HeaderMap,
    body: Vec<u8>,
    peer: SocketAddr,
) -> Response<Body> {
    let path_only = target.split('?').next().unwrap_or(target);
    let path = normalize_path(path_only);
    let host = request_host(headers, state.config.server.port);

    let language = lang::negotiate(
        header_str(headers, &COOKIE).and_then(|c| lang::cookie_value(c, LANG_COOKIE)),
        header_str(headers, &ACCEPT_LANGUAGE),
        &state.config.content.available_languages,
    );

    let mut ctx = RequestContext {
        home: state.config.home_dir(),
        event_key: format!("{host}/{method}{path}"),
        method,
        path,
        host,
        language,
        body,
        auth: AuthState::default(),
        peer,
        error: None,
        response_file: None,
    };

    state.events.emit_request(&mut ctx);

    let resolved = match resolver::resolve(&ctx.home, &state.config.static_dir(), &ctx.path) {
        Ok(resolved) => resolved,
        Err(ResolveError::Forbidden) => return fail(state, &mut ctx, 403),
        Err(ResolveError::NotFound) => return fail(state, &mut ctx, 404),
    };

    if ctx.method == Method::TRACE || ctx.method == Method::CONNECT {
        return fail(state, &mut ctx, 501);
    }

    if resolved.is_dir {
        let methods = dynamic::discover_methods(&resolved.path);

        if ctx.method == Method::OPTIONS {
            let response = error::build_options_response(&dynamic::allow_header(&methods));
            return finish(state, &mut ctx, response);
        }

        if methods.contains(&ctx.method) {
            let request = DynamicRequest {
                method: ctx.method.clone(),
                path: target.to_string(),
                headers: headers.clone(),
                body: ctx.body.clone(),
                language: ctx.language.clone(),
            };
            let force_reload = no_cache_requested(headers);
            return match state.handlers.dispatch(&resolved.path, request, force_reload).await {
                Ok(response) => finish(state, &mut ctx, response),
                Err(err) => {
                    logger::log_error(&format!("Handler dispatch failed: {err}"));
                    fail(state, &mut ctx, 500)
                }
            };
        }

        let index = resolved.path.join("index.html");
        if (ctx.method == Method::GET || ctx.method == Method::HEAD) && index.is_file() {
            return serve_file(state, &mut ctx, headers, index).await;
        }
        return fail(state, &mut ctx, 405);
    }

    serve_file(state, &mut ctx, headers, resolved.path).await
}

/// Deliver a static file: OPTIONS/method gate, auth gate, conditional cache,
/// then streamed or buffered (optionally rendered) delivery.
async fn serve_file(
    state: &AppState,
    ctx: &mut RequestContext,
    headers: &HeaderMap,
    path: PathBuf,
) -> Response<Body> {
    if ctx.method == Method::OPTIONS {
        return finish(state, ctx, error::build_options_response("OPTIONS, GET"));
    }
    if ctx.method != Method::GET && ctx.method != Method::HEAD {
        let response = error::build_method_not_allowed_response();
        return reject(state, ctx, 405, response);
    }

    if ctx.auth.required && !ctx.auth.authorized {
        if !credentials_accepted(state, ctx, headers) {
            return fail(state, ctx, 401);
        }
        ctx.auth.authorized = true;
    }

    let content_type = mime::lookup(&path);
    let parsable = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .is_some_and(|e| state.config.is_parsable_extension(&e));

    // A trusted rendered artifact replaces the source file entirely: its own
    // metadata drives the validators and its bytes are served as-is
    let mut serve_path = path.clone();
    let mut artifact_hit = false;
    if parsable {
        if let Ok(relative) = path.strip_prefix(&ctx.home) {
            let found = crate::template::cache::lookup(
                &state.config.cache_dir(),
                &ctx.host,
                &ctx.language,
                relative,
                no_cache_requested(headers),
            );
            if let Some(artifact) = found {
                serve_path = artifact;
                artifact_hit = true;
            }
        }
    }

    let stat = match std::fs::metadata(&serve_path)
        .and_then(|meta| FileStat::from_metadata(&meta))
    {
        Ok(stat) => stat,
        Err(err) => {
            logger::log_error(&format!(
                "Failed to stat {}: {err}",
                serve_path.display()
            ));
            return fail(state, ctx, 500);
        }
    };
    let mut cache_headers = CacheHeaders::for_stat(&stat, state.config.cache.days);
    let etag = cache_headers.etag.clone();
    ctx.response_file = Some(serve_path.clone());

    let decision = cond::evaluate(
        &stat,
        &etag,
        header_str(headers, &IF_MODIFIED_SINCE),
        header_str(headers, &IF_NONE_MATCH),
    );
    if decision == CacheDecision::NotModified {
        return finish(state, ctx, response::build_not_modified_response(&cache_headers));
    }

    if ctx.method == Method::HEAD {
        let response = response::build_file_response(Bytes::new(), content_type, &cache_headers, true);
        return finish(state, ctx, response);
    }

    if stat.size > http::STREAM_THRESHOLD {
        let window = http::resolve_window(
            header_str(headers, &RANGE),
            header_str(headers, &IF_RANGE),
            &etag,
            stat.size,
        );
        let Some(window) = window else {
            return fail(state, ctx, 500);
        };

        let body = match response::open_range_body(&serve_path, window, content_type).await {
            Ok(body) => body,
            Err(err) => {
                logger::log_error(&format!(
                    "Failed to open {} for streaming: {err}",
                    serve_path.display()
                ));
                return fail(state, ctx, 500);
            }
        };

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let response = response::build_partial_response(
            body,
            content_type,
            &cache_headers,
            window,
            stat.size,
            &filename,
        );
        return finish(state, ctx, response);
    }

    let data = match tokio::fs::read(&serve_path).await {
        Ok(data) => data,
        Err(err) => {
            logger::log_error(&format!(
                "Failed to read {}: {err}",
                serve_path.display()
            ));
            return fail(state, ctx, 500);
        }
    };

    let mut payload = Bytes::from(data);
    if parsable && !artifact_hit {
        let source = String::from_utf8_lossy(&payload).into_owned();
        let meta = RenderMeta {
            home: &ctx.home,
            file: &path,
            host: &ctx.host,
            language: &ctx.language,
        };
        if let RenderOutcome::Rendered { body, rendered_at, .. } =
            state.engine.render(&source, &meta)
        {
            cache_headers.refresh_for_render(
                rendered_at,
                state.config.cache.days,
                body.len() as u64,
            );
            payload = Bytes::from(body);
        }
    }

    let response = response::build_file_response(payload, content_type, &cache_headers, false);
    finish(state, ctx, response)
}

/// Check `Authorization: Basic <credentials>` against the installed
/// authenticator.
fn credentials_accepted(state: &AppState, ctx: &RequestContext, headers: &HeaderMap) -> bool {
    header_str(headers, &AUTHORIZATION)
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| BASE64.decode(encoded.trim()).ok())
        .and_then(|raw| String::from_utf8(raw).ok())
        .and_then(|credentials| {
            credentials
                .split_once(':')
                .map(|(user, pass)| state.events.authenticate(user, pass, ctx.peer))
        })
        .unwrap_or(false)
}

/// Extensionless paths address a directory; give them a trailing slash.
fn normalize_path(path: &str) -> String {
    let mut normalized = path.to_string();
    if Path::new(path).extension().is_none() && !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Host header with the listen port appended when the client omitted it.
fn request_host(headers: &HeaderMap, port: u16) -> String {
    let host = header_str(headers, &HOST).unwrap_or("localhost");
    if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:{port}")
    }
}

fn no_cache_requested(headers: &HeaderMap) -> bool {
    header_str(headers, &CACHE_CONTROL).is_some_and(|v| v.contains("no-cache"))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Successful completion: response observers fire, then common headers and
/// the access log line.
fn finish(state: &AppState, ctx: &mut RequestContext, response: Response<Body>) -> Response<Body> {
    state.events.emit_response(ctx);
    finalize(state, ctx, response)
}

/// Error completion with the default body for `code`.
fn fail(state: &AppState, ctx: &mut RequestContext, code: u16) -> Response<Body> {
    let response = match code {
        401 => error::build_unauthorized_response(&ctx.auth.realm),
        _ => error::build_error_response(code),
    };
    reject(state, ctx, code, response)
}

/// Error completion with a caller-built response.
fn reject(
    state: &AppState,
    ctx: &mut RequestContext,
    code: u16,
    response: Response<Body>,
) -> Response<Body> {
    ctx.error = Some(code);
    state.events.emit_error(code, ctx);
    finalize(state, ctx, response)
}

fn finalize(
    state: &AppState,
    ctx: &RequestContext,
    mut response: Response<Body>,
) -> Response<Body> {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&state.config.server.server_info) {
        headers.insert(SERVER, value);
    }
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );

    if state.config.logging.access_log {
        logger::log_request(&ctx.event_key, response.status().as_u16());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_appends_slash_without_extension() {
        assert_eq!(normalize_path("/folder1"), "/folder1/");
        assert_eq!(normalize_path("/folder1/"), "/folder1/");
        assert_eq!(normalize_path("/index.html"), "/index.html");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_request_host_appends_port() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_host(&headers, 8080), "localhost:8080");

        headers.insert(HOST, HeaderValue::from_static("example.com"));
        assert_eq!(request_host(&headers, 8080), "example.com:8080");

        headers.insert(HOST, HeaderValue::from_static("example.com:9999"));
        assert_eq!(request_host(&headers, 8080), "example.com:9999");
    }

    #[test]
    fn test_no_cache_detection() {
        let mut headers = HeaderMap::new();
        assert!(!no_cache_requested(&headers));

        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        assert!(!no_cache_requested(&headers));

        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        assert!(no_cache_requested(&headers));
    }

    #[test]
    fn test_default_auth_state() {
        let auth = AuthState::default();
        assert_eq!(auth.realm, "Noob Realm");
        assert!(!auth.required);
        assert!(!auth.authorized);
    }
}
