//! Logger module
//!
//! Provides logging utilities for the file server including:
//! - Startup banner
//! - Access logging with multiple formats
//! - Error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
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

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

/// Print the startup banner
///
/// Always goes to stdout, regardless of where the access log is written.
pub fn log_server_start(port: u16, root: &Path) {
    print!("{}", startup_banner(port, root));
}

/// Startup banner text, one entry per line including the trailing blank line
fn startup_banner(port: u16, root: &Path) -> String {
    format!(
        "✅ Server running at http://localhost:{port}/\n\
         ✅ App (redirect): http://localhost:{port}/index.html\n\
         ✅ Dashboard: http://localhost:{port}/core/index.html\n\
         ✅ Sign-in: http://localhost:{port}/core/sign-in.html\n\
         📁 Serving directory: {}\n\
         \n\
         Press Ctrl+C to stop the server\n\
         \n",
        root.display()
    )
}

pub fn log_server_stopped() {
    println!("Server stopped");
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

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}
