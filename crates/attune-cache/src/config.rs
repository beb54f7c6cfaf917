//! Configuration for the TTL cache.

use std::time::Duration;

use attune_types::{HasCacheConfig, config_defaults};

/// Configuration for the TTL cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Interval between sweeps for expired entries.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval: config_defaults::sweep_interval(),
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any configuration provider.
    pub fn from_provider<C: HasCacheConfig>(config: &C) -> Self {
        Self::new().with_sweep_interval(config.sweep_interval())
    }

    /// Set the sweep interval. A zero interval is clamped to one millisecond.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval.max(Duration::from_millis(1));
        self
    }
}
