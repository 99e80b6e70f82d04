//! Bootstrap configuration loading
//!
//! The TOML file is read once at startup. Every field has a built-in default,
//! so a missing file (or a missing section or key) is never fatal: the loader
//! logs a warning and carries on with defaults. A file that exists but does not
//! parse is reported as a configuration error.
//!
//! # Resolution order
//!
//! 1. Explicit path (command-line `--config`)
//! 2. `WAVPLAY_CONFIG` environment variable
//! 3. `<config_dir>/wavplay/config.toml` (platform config directory)
//! 4. Built-in defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "WAVPLAY_CONFIG";

/// Default number of clips that may wait behind the playing one
pub const DEFAULT_QUEUE_LEN: usize = 4;

/// Default streaming chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default volume (percent)
pub const DEFAULT_VOLUME: u8 = 100;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Playback engine parameters
    pub player: PlayerSection,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// `[player]` section
///
/// Durations are stored in milliseconds so the file stays human-editable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSection {
    /// Capacity of the playback queue
    pub queue_len: usize,

    /// Bytes moved from backend to sink per streaming iteration
    pub chunk_size: usize,

    /// Volume applied until changed at runtime (0-100)
    pub initial_volume: u8,

    /// Byte-swap 16-bit samples for TDA1543-style DACs
    pub legacy_dac_mode: bool,

    /// How long the idle worker waits for a clip before re-checking shutdown
    pub dequeue_timeout_ms: u64,

    /// Sleep between checks while paused (upper bound on resume latency)
    pub pause_poll_interval_ms: u64,

    /// Timeout for a single sink write
    pub write_timeout_ms: u64,

    /// Consecutive zero-progress sink writes tolerated before a clip is aborted
    pub max_write_retries: u32,

    /// How long shutdown waits for the worker to exit
    pub shutdown_timeout_ms: u64,

    /// Event bus buffer size
    pub event_capacity: usize,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            queue_len: DEFAULT_QUEUE_LEN,
            chunk_size: DEFAULT_CHUNK_SIZE,
            initial_volume: DEFAULT_VOLUME,
            legacy_dac_mode: false,
            dequeue_timeout_ms: 100,
            pause_poll_interval_ms: 10,
            write_timeout_ms: 100,
            max_write_retries: 10,
            shutdown_timeout_ms: 2000,
            event_capacity: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from a file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve and load the configuration, falling back to defaults
    ///
    /// Missing files produce a warning, not an error.
    pub fn load_or_default(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                debug!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Determine which configuration file to use
///
/// Returns `None` when neither an explicit path nor an existing platform file
/// is available. Explicit paths are returned even if they do not exist so the
/// caller can warn about them.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("wavplay").join("config.toml"))
        .filter(|p| p.exists())
}
