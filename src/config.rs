//! Runtime configuration.

use crate::error::{Result, TrackerError};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Tracker configuration.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Path to the bucket file.
    pub db_path: PathBuf,

    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,

    /// Directory served at `/`; cover images land under `img/` inside it.
    pub static_dir: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("series.db"),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            static_dir: PathBuf::from("static"),
        }
    }
}

impl TrackerConfig {
    /// Build a config from the environment, falling back to defaults.
    ///
    /// Recognized variables: `WATCHLOG_DB`, `WATCHLOG_LISTEN`,
    /// `WATCHLOG_STATIC`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = env::var("WATCHLOG_DB") {
            config.db_path = PathBuf::from(path);
        }
        if let Ok(addr) = env::var("WATCHLOG_LISTEN") {
            config.listen_addr = addr
                .parse()
                .map_err(|e| TrackerError::Config(format!("bad listen address {addr:?}: {e}")))?;
        }
        if let Ok(dir) = env::var("WATCHLOG_STATIC") {
            config.static_dir = PathBuf::from(dir);
        }

        Ok(config)
    }
}
