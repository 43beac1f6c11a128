//! Logger module
//!
//! Logging utilities for the server: lifecycle, access lines, errors and
//! template-cache persistence failures. Falls back to stdout/stderr until
//! [`init`] configures file targets.

pub mod writer;

use crate::config::Config;
use std::net::SocketAddr;
use std::path::Path;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info(&format!("{} started", config.server.server_info));
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Document root: {}", config.server.home));
    write_info(&format!(
        "Template cache: {} ({} days)",
        config.cache.dir, config.cache.days
    ));
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

/// Log one access line for a finished request.
pub fn log_request(event_key: &str, status: u16) {
    write_info(&format!("[Request] {event_key} -> {status}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// A dynamic handler missed its response deadline.
pub fn log_handler_deadline(path: &Path) {
    write_error(&format!(
        "[ERROR] Handler {} did not respond before its deadline",
        path.display()
    ));
}

/// A fire-and-forget cache write failed; never surfaced to the client.
pub fn log_cache_persist_failed(path: &Path, err: &std::io::Error) {
    write_error(&format!(
        "[WARN] Failed to persist rendered artifact {}: {err}",
        path.display()
    ));
}
