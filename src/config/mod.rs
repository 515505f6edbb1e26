//! Configuration module entry point
//!
//! Loads layered configuration and resolves the document root

mod state;
mod types;

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

// Re-export public types
pub use state::AppState;
pub use types::Config;

/// Name of the optional configuration file, looked up next to the executable
pub const CONFIG_FILE_NAME: &str = "fila-server.toml";

/// Prefix for environment overrides, e.g. `FILA_SERVER__PORT=8080`
const ENV_PREFIX: &str = "FILA";

impl Config {
    /// Load configuration from the file next to the executable, then the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let dir = entry_point_dir().map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;
        Self::load_from(&dir.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the specified file path
    /// A missing file is not an error: defaults and environment still apply
    pub fn load_from(config_path: &Path) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout", 30)?
            .set_default(
                "http.server_name",
                concat!("fila-server/", env!("CARGO_PKG_VERSION")),
            )?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Resolve the document root to a canonical absolute directory
    ///
    /// Without `server.root` the root is `entry_dir` itself.
    pub fn resolve_root(&self, entry_dir: &Path) -> io::Result<PathBuf> {
        let root = match self.server.root.as_deref() {
            Some(root) => entry_dir.join(root),
            None => entry_dir.to_path_buf(),
        };

        let root = root.canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("document root is not a directory: {}", root.display()),
            ));
        }
        Ok(root)
    }
}

/// Directory containing the running executable
pub fn entry_point_dir() -> io::Result<PathBuf> {
    let exe = std::env::current_exe()?.canonicalize()?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "executable has no parent directory",
        )
    })
}
