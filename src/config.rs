//! Engine configuration
//!
//! TOML file resolved in priority order: explicit path argument, then the
//! `PLAYQ_CONFIG` environment variable, then the platform config directory.
//! A missing file is normal (defaults apply); an unreadable or malformed
//! file is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PLAYQ_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Default enqueue mode: splice new tracks ahead of the queue
    pub interrupt: bool,
    /// Track-change monitor polling interval, seconds
    pub monitor_interval_secs: u64,
    /// Timeout for validation probes and metadata lookups, seconds
    pub probe_timeout_secs: u64,
    /// Entries per resolution-cache purpose
    pub cache_capacity: usize,
    /// Playlist storage directory; `None` keeps the store disabled
    pub playlist_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interrupt: false,
            monitor_interval_secs: 2,
            probe_timeout_secs: 10,
            cache_capacity: crate::cache::DEFAULT_CACHE_CAPACITY,
            playlist_dir: None,
        }
    }
}

impl EngineConfig {
    /// Resolve configuration: `path` argument, `PLAYQ_CONFIG`, platform
    /// config dir, defaults; first hit wins.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&env_path));
        }
        if let Some(default_path) = Self::default_path() {
            if default_path.is_file() {
                return Self::from_file(&default_path);
            }
            debug!("No config at {}, using defaults", default_path.display());
        }
        Ok(Self::default())
    }

    /// Load from a specific file. The file not existing is a warning and
    /// falls back to defaults; anything else is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(Error::Config(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }

    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("playq").join("config.toml"))
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}
