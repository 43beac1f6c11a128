// Configuration type definitions
// Every ambient path and tuning knob lives here; construction-time value, no
// runtime mutation.

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub content: ContentConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Document root served to clients.
    pub home: String,
    /// Directory holding the server's own shared assets (favicon, robots).
    pub static_dir: String,
    /// Value of the `Server` response header.
    pub server_info: String,
    /// TLS key/cert material; termination itself is delegated to the
    /// fronting listener.
    pub ssl: Option<SslConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SslConfig {
    pub key_file: String,
    pub cert_file: String,
}

/// Rendered-template disk cache settings.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub dir: String,
    /// Cache lifetime in whole days, drives the Expires header.
    pub days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    /// Extensions (with leading dot) run through the template engine.
    pub parsable_extensions: Vec<String>,
    /// Languages the artifact cache and negotiation may select.
    pub available_languages: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    pub access_log_file: Option<String>,
    pub error_log_file: Option<String>,
}
