//! Application state module
//!
//! Immutable per-process values shared by every connection

use std::path::{Path, PathBuf};

use super::types::Config;

/// Application state
///
/// Built once at startup and shared through `Arc`; nothing in it changes
/// while the server runs, so no locking is involved.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    /// Canonical document root; every served path must stay beneath it
    root: PathBuf,
}

impl AppState {
    pub const fn new(config: Config, root: PathBuf) -> Self {
        Self { config, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
