//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [cache]                  # TTL cache sweeper
//! [focus]                  # session lifecycle limits
//! [storage]                # history database
//! ```

use std::path::PathBuf;
use std::time::Duration;

use attune_types::config_defaults as defaults;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Application name used for platform directories.
pub(crate) const APP_NAME: &str = "attune";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// Maps to the full TOML config file. All sections are optional so that
/// partial configs (e.g., project-local overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttuneConfig {
    /// TTL cache configuration.
    pub cache: Option<CacheSection>,

    /// Focus session configuration.
    pub focus: Option<FocusConfig>,

    /// History storage configuration.
    pub storage: Option<StorageConfig>,
}

impl AttuneConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: AttuneConfig) {
        if other.cache.is_some() {
            self.cache = other.cache;
        }

        if other.focus.is_some() {
            self.focus = other.focus;
        }

        if other.storage.is_some() {
            self.storage = other.storage;
        }
    }

    /// Effective cache section (defaults when absent).
    pub fn cache(&self) -> CacheSection {
        self.cache.clone().unwrap_or_default()
    }

    /// Effective focus section (defaults when absent).
    pub fn focus(&self) -> FocusConfig {
        self.focus.clone().unwrap_or_default()
    }

    /// Effective storage section (defaults when absent).
    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        let cache = self.cache();
        if cache.sweep_interval_secs == 0 {
            return Err(invalid("cache.sweep_interval_secs", "must be greater than zero"));
        }

        let focus = self.focus();
        if focus.min_duration_secs == 0 {
            return Err(invalid("focus.min_duration_secs", "must be greater than zero"));
        }
        if focus.max_duration_secs < focus.min_duration_secs {
            return Err(invalid(
                "focus.max_duration_secs",
                "must not be smaller than focus.min_duration_secs",
            ));
        }
        if focus.trigger_buffer == 0 {
            return Err(invalid("focus.trigger_buffer", "must be greater than zero"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// TTL cache configuration.
///
/// ```toml
/// [cache]
/// sweep_interval_secs = 60
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Interval in seconds between sweeps for expired entries.
    pub sweep_interval_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            sweep_interval_secs: defaults::SWEEP_INTERVAL_SECS,
        }
    }
}

impl attune_types::ConfigProvider for CacheSection {}

impl attune_types::HasCacheConfig for CacheSection {
    fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Focus Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Focus session lifecycle configuration.
///
/// ```toml
/// [focus]
/// safety_window_secs = 180
/// min_duration_secs = 60
/// max_duration_secs = 86400
/// trigger_buffer = 64
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Extra seconds a session record outlives its duration in the cache.
    pub safety_window_secs: u64,
    /// Shortest accepted session, in seconds.
    pub min_duration_secs: u64,
    /// Longest accepted session, in seconds.
    pub max_duration_secs: u64,
    /// Capacity of the outbound trigger channel.
    pub trigger_buffer: usize,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            safety_window_secs: defaults::SAFETY_WINDOW_SECS,
            min_duration_secs: defaults::MIN_DURATION_SECS,
            max_duration_secs: defaults::MAX_DURATION_SECS,
            trigger_buffer: defaults::TRIGGER_BUFFER,
        }
    }
}

impl attune_types::ConfigProvider for FocusConfig {}

impl attune_types::HasFocusConfig for FocusConfig {
    fn safety_window(&self) -> Duration {
        Duration::from_secs(self.safety_window_secs)
    }

    fn min_duration(&self) -> Duration {
        Duration::from_secs(self.min_duration_secs)
    }

    fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }

    fn trigger_buffer(&self) -> usize {
        self.trigger_buffer
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// History storage configuration.
///
/// ```toml
/// [storage]
/// path = "/var/lib/attune/attune.db"
/// in_memory = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
    /// Keep history in memory only.
    pub in_memory: bool,
}

/// Environment variable overriding the database path.
const DB_PATH_ENV: &str = "ATTUNE_DB_PATH";

impl StorageConfig {
    /// Get the effective database path, checking the environment first.
    ///
    /// Resolution order:
    /// 1. `ATTUNE_DB_PATH` environment variable
    /// 2. Configured `path` value
    /// 3. Default: `<data dir>/attune/attune.db`
    pub fn effective_path(&self) -> PathBuf {
        if let Ok(env_path) = std::env::var(DB_PATH_ENV)
            && !env_path.is_empty()
        {
            return PathBuf::from(env_path);
        }

        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join("attune.db")
        })
    }
}
