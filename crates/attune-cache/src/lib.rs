//! Concurrent key-value cache with optional per-entry TTL.
//!
//! This crate provides a small typed caching layer with:
//! - Optional per-entry expiration (`set_with_ttl`)
//! - Lazy eviction of expired entries on read
//! - A background sweeper task that periodically drops expired entries
//!
//! # Example
//!
//! ```rust,ignore
//! use attune_cache::{CacheConfig, TtlCache};
//!
//! let cache: TtlCache<bool> = TtlCache::new(CacheConfig::default());
//! cache.set_with_ttl("awaiting-input:42", true, Duration::from_secs(300));
//!
//! let sweeper = cache.spawn_sweeper(&shutdown);
//! ```

mod cache;
mod config;
mod sweeper;

pub use cache::{CacheEntry, CacheStats, TtlCache};
pub use config::CacheConfig;
pub use sweeper::SweeperHandle;
