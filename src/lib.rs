//! A static-asset HTTP server with conditional caching, streamed byte-range
//! delivery, per-directory dynamic handlers and an include/layout template
//! engine backed by a rendered-artifact disk cache.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod template;
