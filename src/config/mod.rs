// Configuration module entry point
// Loads the explicit configuration value the rest of the server is built
// from: file source, NOOBHTTP_* environment overrides, then defaults.

mod types;

use std::net::SocketAddr;
use std::path::PathBuf;

// Re-export public types
pub use types::{CacheConfig, Config, ContentConfig, LoggingConfig, ServerConfig, SslConfig};

/// Default `Server` header banner.
pub fn default_server_info() -> String {
    format!("NoobHTTP/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("NOOBHTTP"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.home", "./public")?
            .set_default("server.static_dir", "./static")?
            .set_default("server.server_info", default_server_info())?
            .set_default("cache.dir", "/tmp/noobhttp/cache")?
            .set_default("cache.days", 2)?
            .set_default("content.parsable_extensions", vec![".html"])?
            .set_default("content.available_languages", vec!["en"])?
            .set_default("logging.access_log", true)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Document root as a path.
    pub fn home_dir(&self) -> PathBuf {
        PathBuf::from(&self.server.home)
    }

    /// Rendered-artifact cache root as a path.
    pub fn cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.cache.dir)
    }

    /// Shared-asset directory as a path.
    pub fn static_dir(&self) -> PathBuf {
        PathBuf::from(&self.server.static_dir)
    }

    /// Whether files with this extension (leading dot) go through the
    /// template engine.
    pub fn is_parsable_extension(&self, extension: &str) -> bool {
        self.content
            .parsable_extensions
            .iter()
            .any(|e| e == extension)
    }
}
