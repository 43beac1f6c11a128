//! Server lifecycle observer module
//!
//! Explicit observer interface for named lifecycle events: request-received,
//! response-emitted, error-emitted, and the authenticate capability. Replaces
//! any ambient event plumbing; the router owns the registry and fires the
//! callbacks at fixed pipeline points.

use super::router::RequestContext;
use std::net::SocketAddr;

pub type RequestObserver = Box<dyn Fn(&mut RequestContext) + Send + Sync>;
pub type ResponseObserver = Box<dyn Fn(&RequestContext) + Send + Sync>;
pub type ErrorObserver = Box<dyn Fn(u16, &RequestContext) + Send + Sync>;

/// Credential verification capability: `(username, password, client) → bool`.
/// The core never inspects credentials itself.
pub type Authenticator = Box<dyn Fn(&str, &str, SocketAddr) -> bool + Send + Sync>;

/// Observer registry fired across a request's lifecycle.
///
/// Request observers run before routing and may mutate the context, e.g. to
/// demand authentication for a subtree. Response and error observers are
/// notification-only.
#[derive(Default)]
pub struct ServerEvents {
    request: Vec<RequestObserver>,
    response: Vec<ResponseObserver>,
    error: Vec<ErrorObserver>,
    authenticator: Option<Authenticator>,
}

impl ServerEvents {
    pub fn on_request(&mut self, observer: impl Fn(&mut RequestContext) + Send + Sync + 'static) {
        self.request.push(Box::new(observer));
    }

    pub fn on_response(&mut self, observer: impl Fn(&RequestContext) + Send + Sync + 'static) {
        self.response.push(Box::new(observer));
    }

    pub fn on_error(&mut self, observer: impl Fn(u16, &RequestContext) + Send + Sync + 'static) {
        self.error.push(Box::new(observer));
    }

    /// Install the basic-auth verification capability.
    pub fn set_authenticator(
        &mut self,
        authenticator: impl Fn(&str, &str, SocketAddr) -> bool + Send + Sync + 'static,
    ) {
        self.authenticator = Some(Box::new(authenticator));
    }

    pub(crate) fn emit_request(&self, ctx: &mut RequestContext) {
        for observer in &self.request {
            observer(ctx);
        }
    }

    pub(crate) fn emit_response(&self, ctx: &RequestContext) {
        for observer in &self.response {
            observer(ctx);
        }
    }

    pub(crate) fn emit_error(&self, code: u16, ctx: &RequestContext) {
        for observer in &self.error {
            observer(code, ctx);
        }
    }

    /// Verify credentials; without an installed authenticator nothing is
    /// authorized.
    pub(crate) fn authenticate(&self, username: &str, password: &str, peer: SocketAddr) -> bool {
        self.authenticator
            .as_ref()
            .is_some_and(|auth| auth(username, password, peer))
    }
}

impl std::fmt::Debug for ServerEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerEvents")
            .field("request", &self.request.len())
            .field("response", &self.response.len())
            .field("error", &self.error.len())
            .field("authenticator", &self.authenticator.is_some())
            .finish()
    }
}
