//! Shared types for the Attune focus session system.

pub mod config;
pub mod focus;
pub mod trigger;

pub use config::{
    CacheConfigProvider, ConfigProvider, FocusConfigProvider, HasCacheConfig, HasFocusConfig,
    defaults as config_defaults,
};
pub use focus::{FocusSession, FocusSessionId, FocusStatus, MAX_QUALITY};
pub use trigger::{Trigger, TriggerKind};

/// Wall-clock timestamp used across all crates.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current wall-clock time.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}
