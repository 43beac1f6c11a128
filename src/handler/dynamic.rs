//! Dynamic handler dispatch module
//!
//! Per-directory method handlers are discovered from `.{method}.js` marker
//! files and dispatched through an explicit registry with a hard response
//! deadline. Handler code runs as a spawned task; a handler that misses the
//! deadline is detached, not killed, and the client gets a 500.

use crate::http::Body;
use crate::logger;
use hyper::{HeaderMap, Method, Response};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Hard deadline for a handler to produce its response.
pub const HANDLER_DEADLINE: Duration = Duration::from_millis(2000);

/// Discovery order; also the order method names appear in `Allow` lists.
const DISCOVERY_ORDER: &[Method] = &[Method::POST, Method::GET, Method::DELETE, Method::PUT];

/// Marker file advertising a handler for `method` in `dir`.
pub fn handler_file(dir: &Path, method: &Method) -> PathBuf {
    dir.join(format!(".{}.js", method.as_str().to_lowercase()))
}

/// List the methods a directory advertises handlers for, in discovery order.
pub fn discover_methods(dir: &Path) -> Vec<Method> {
    DISCOVERY_ORDER
        .iter()
        .filter(|method| handler_file(dir, method).is_file())
        .cloned()
        .collect()
}

/// `Allow` header value for an advertised method set. OPTIONS always leads.
pub fn allow_header(methods: &[Method]) -> String {
    let mut allow = String::from("OPTIONS");
    for method in methods {
        allow.push_str(", ");
        allow.push_str(method.as_str());
    }
    allow
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("no handler registered for {0}")]
    NotLoaded(PathBuf),
    #[error("handler failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("handler exceeded its deadline")]
    Deadline,
    #[error("handler invocation failed: {0}")]
    Invoke(String),
}

/// Request view handed to a dynamic handler.
#[derive(Debug, Clone)]
pub struct DynamicRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub language: String,
}

pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<Response<Body>, HandlerError>> + Send>>;

/// A loaded handler, callable once per request.
pub trait DynamicHandler: Send + Sync {
    fn call(&self, request: DynamicRequest, deadline: DeadlineToken) -> HandlerFuture;
}

/// Produces handler instances from marker-file paths.
///
/// The registry consults the loader on first dispatch for a path and on
/// explicit [`HandlerRegistry::reload`]; handlers never load implicitly more
/// than once.
pub trait HandlerLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn DynamicHandler>, HandlerError>;
}

/// Loader backed by in-process registration.
///
/// Handlers register under the exact marker-file path the resolver produces
/// for them.
#[derive(Default)]
pub struct RegistryLoader {
    handlers: std::sync::Mutex<HashMap<PathBuf, Arc<dyn DynamicHandler>>>,
}

impl RegistryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: PathBuf, handler: Arc<dyn DynamicHandler>) {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.insert(path, handler);
        }
    }
}

impl HandlerLoader for RegistryLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn DynamicHandler>, HandlerError> {
        let handlers = self
            .handlers
            .lock()
            .map_err(|_| HandlerError::Load {
                path: path.to_path_buf(),
                reason: "registration table poisoned".to_string(),
            })?;
        handlers
            .get(path)
            .cloned()
            .ok_or_else(|| HandlerError::NotLoaded(path.to_path_buf()))
    }
}

/// Cooperative deadline signal handed to a running handler.
///
/// A handler that responds in time calls [`DeadlineToken::cancel`]; the
/// dispatcher's timer then never fires. The check-then-respond race is
/// accepted: a handler may be detached just as its response completes.
#[derive(Debug, Clone)]
pub struct DeadlineToken {
    cancelled: Arc<AtomicBool>,
    ttl: Duration,
}

impl DeadlineToken {
    fn new(ttl: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            ttl,
        }
    }

    /// Disarm the deadline; the handler has produced its response.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves when the deadline expires without being cancelled; pends
    /// forever once cancelled.
    pub async fn expired(&self) {
        tokio::time::sleep(self.ttl).await;
        if self.is_cancelled() {
            std::future::pending::<()>().await;
        }
    }
}

/// Explicit registry of loaded handlers keyed by marker-file path.
pub struct HandlerRegistry {
    loader: Box<dyn HandlerLoader>,
    loaded: RwLock<HashMap<PathBuf, Arc<dyn DynamicHandler>>>,
}

impl HandlerRegistry {
    pub fn new(loader: Box<dyn HandlerLoader>) -> Self {
        Self {
            loader,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Load (or replace) the handler for a marker-file path.
    pub async fn reload(&self, path: &Path) -> Result<Arc<dyn DynamicHandler>, HandlerError> {
        let handler = self.loader.load(path)?;
        self.loaded
            .write()
            .await
            .insert(path.to_path_buf(), Arc::clone(&handler));
        Ok(handler)
    }

    async fn handler_for(
        &self,
        path: &Path,
        force_reload: bool,
    ) -> Result<Arc<dyn DynamicHandler>, HandlerError> {
        if !force_reload {
            if let Some(handler) = self.loaded.read().await.get(path) {
                return Ok(Arc::clone(handler));
            }
        }
        self.reload(path).await
    }

    /// Dispatch a request to the directory's handler for its method.
    ///
    /// The handler runs as its own task racing the deadline timer. On
    /// expiry the task is left running detached and the caller maps the
    /// error to a 500.
    pub async fn dispatch(
        &self,
        dir: &Path,
        request: DynamicRequest,
        force_reload: bool,
    ) -> Result<Response<Body>, HandlerError> {
        let path = handler_file(dir, &request.method);
        let handler = self.handler_for(&path, force_reload).await?;

        let deadline = DeadlineToken::new(HANDLER_DEADLINE);
        let timer = deadline.clone();
        let task = tokio::spawn(handler.call(request, deadline));

        tokio::select! {
            joined = task => match joined {
                Ok(result) => result,
                Err(err) => Err(HandlerError::Invoke(err.to_string())),
            },
            () = timer.expired() => {
                logger::log_handler_deadline(&path);
                Err(HandlerError::Deadline)
            }
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry").finish_non_exhaustive()
    }
}
