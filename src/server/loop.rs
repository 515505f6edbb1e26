//! Server loop module
//!
//! Accepts connections until shutdown is requested

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config;
use crate::logger;

/// Accept loop for the file server
///
/// Runs until `shutdown` is notified, then drops the listener so the port is
/// released. Must run inside a `LocalSet`, since connections are served with
/// `spawn_local`.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<config::AppState>,
    shutdown: Arc<Notify>,
) -> Result<(), Box<dyn std::error::Error>> {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                break;
            }
        }
    }

    let in_flight = active_connections.load(Ordering::SeqCst);
    if in_flight > 0 {
        logger::log_warning(&format!(
            "Closing listener with {in_flight} connection(s) still open"
        ));
    }
    drop(listener);
    Ok(())
}
