//! Request handler module
//!
//! The static file responder: path resolution, file and directory serving,
//! and the error taxonomy that maps failures onto HTTP responses.

pub mod error;
pub mod listing;
pub mod path;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use error::ServeError;
pub use router::handle_request;
