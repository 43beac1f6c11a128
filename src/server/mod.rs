// Server module entry point
// Listener creation and the accept loop.

pub mod connection;
pub mod listener;

use crate::handler::AppState;
use crate::logger;
use std::sync::Arc;

// Re-export commonly used items
pub use listener::create_reusable_listener;

/// Accept connections forever, serving each on its own task.
pub async fn run(listener: tokio::net::TcpListener, state: Arc<AppState>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                connection::handle_connection(stream, peer_addr, Arc::clone(&state));
            }
            Err(err) => {
                logger::log_error(&format!("Failed to accept connection: {err}"));
            }
        }
    }
}
