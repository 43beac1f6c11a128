//! Request handling module
//!
//! Static resolution, language negotiation, lifecycle events, dynamic
//! per-directory handlers and the routing pipeline that ties them together.

pub mod dynamic;
pub mod events;
pub mod lang;
pub mod resolver;
pub mod router;

// Re-export commonly used types
pub use dynamic::{
    DynamicHandler, DynamicRequest, HandlerError, HandlerLoader, HandlerRegistry, RegistryLoader,
};
pub use events::ServerEvents;
pub use router::{handle_request, AppState, RequestContext};
