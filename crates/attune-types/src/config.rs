//! Configuration traits for decoupled config passing between crates.
//!
//! These traits allow components to depend on configuration capabilities without
//! requiring direct knowledge of the full configuration structure. Each trait
//! represents a specific configuration capability.

use std::time::Duration;

/// Base trait for all configuration types.
///
/// Provides common functionality expected of all config types. Implementations
/// should be cheaply cloneable and thread-safe.
pub trait ConfigProvider: Clone + Send + Sync + 'static {}

/// TTL cache configuration.
pub trait HasCacheConfig: ConfigProvider {
    /// Interval between sweeps for expired entries.
    fn sweep_interval(&self) -> Duration;
}

/// Focus session lifecycle configuration.
///
/// Provides duration bounds for new sessions and the cache margin kept
/// around a running session.
pub trait HasFocusConfig: ConfigProvider {
    /// Extra TTL added on top of a session's duration in the record cache.
    fn safety_window(&self) -> Duration;

    /// Shortest accepted session duration.
    fn min_duration(&self) -> Duration;

    /// Longest accepted session duration.
    fn max_duration(&self) -> Duration;

    /// Capacity of the outbound trigger channel.
    fn trigger_buffer(&self) -> usize {
        defaults::TRIGGER_BUFFER
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Default implementations for common types
// ─────────────────────────────────────────────────────────────────────────────

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    pub const SWEEP_INTERVAL_SECS: u64 = 60;
    pub const SAFETY_WINDOW_SECS: u64 = 3 * 60;
    pub const MIN_DURATION_SECS: u64 = 60;
    pub const MAX_DURATION_SECS: u64 = 24 * 60 * 60;
    pub const TRIGGER_BUFFER: usize = 64;

    pub fn sweep_interval() -> Duration {
        Duration::from_secs(SWEEP_INTERVAL_SECS)
    }

    pub fn safety_window() -> Duration {
        Duration::from_secs(SAFETY_WINDOW_SECS)
    }

    pub fn min_duration() -> Duration {
        Duration::from_secs(MIN_DURATION_SECS)
    }

    pub fn max_duration() -> Duration {
        Duration::from_secs(MAX_DURATION_SECS)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Simple wrapper types for standalone config passing
// ─────────────────────────────────────────────────────────────────────────────

/// Standalone cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfigProvider {
    pub sweep_interval: Duration,
}

impl Default for CacheConfigProvider {
    fn default() -> Self {
        Self {
            sweep_interval: defaults::sweep_interval(),
        }
    }
}

impl ConfigProvider for CacheConfigProvider {}

impl HasCacheConfig for CacheConfigProvider {
    fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }
}

/// Standalone focus configuration.
#[derive(Debug, Clone)]
pub struct FocusConfigProvider {
    pub safety_window: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub trigger_buffer: usize,
}

impl Default for FocusConfigProvider {
    fn default() -> Self {
        Self {
            safety_window: defaults::safety_window(),
            min_duration: defaults::min_duration(),
            max_duration: defaults::max_duration(),
            trigger_buffer: defaults::TRIGGER_BUFFER,
        }
    }
}

impl ConfigProvider for FocusConfigProvider {}

impl HasFocusConfig for FocusConfigProvider {
    fn safety_window(&self) -> Duration {
        self.safety_window
    }

    fn min_duration(&self) -> Duration {
        self.min_duration
    }

    fn max_duration(&self) -> Duration {
        self.max_duration
    }

    fn trigger_buffer(&self) -> usize {
        self.trigger_buffer
    }
}
