//! Signal handling module
//!
//! Supported signals:
//! - SIGINT:  Graceful shutdown (Ctrl+C)
//! - SIGTERM: Graceful shutdown

use std::sync::Arc;
use tokio::sync::Notify;

/// Start signal handlers (Unix)
///
/// Registers SIGINT and SIGTERM, then spawns a task that notifies
/// `shutdown` on the first one received. Registration errors are returned
/// instead of surfacing later inside the task.
#[cfg(unix)]
pub fn start_signal_handler(shutdown: Arc<Notify>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => println!("\n[SIGNAL] SIGINT received (Ctrl+C), shutting down..."),
            _ = sigterm.recv() => println!("\n[SIGNAL] SIGTERM received, shutting down..."),
        }
        // notify_one stores a permit if the accept loop isn't waiting yet
        shutdown.notify_one();
    });

    Ok(())
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: Arc<Notify>) -> std::io::Result<()> {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            println!("\n[SIGNAL] Ctrl+C received, shutting down...");
            shutdown.notify_one();
        }
    });

    Ok(())
}
