//! Tagged cache layer for schema descriptors
//!
//! Provides pluggable cache backends with a unified async interface and a
//! typed [`SchemaCacheStore`] on top of them.
//!
//! # Available Backends
//!
//! - [`NoopCache`] - stores nothing (every lookup falls back to the catalog)
//! - [`InMemoryCache`] - thread-safe in-memory cache with TTL support
//! - [`FileCache`] - one directory per tag on local disk, kept across runs
//!
//! Wrap any backend with [`TracedCache`] to add tracing spans and logging.
//!
//! # Tags
//!
//! Every write carries the [`CacheTag`](crate::CacheTag) of the connection it
//! belongs to. Invalidating a tag is the only bulk-clear operation; it removes
//! the table descriptors and the freshness record together. Several databases
//! or users can therefore share one backend without seeing each other's
//! entries.

mod config;
mod error;
mod file;
mod key;
mod memory;
mod noop;
mod provider;
mod store;
mod traced;

use std::sync::Arc;

pub use config::{CacheBackend, CacheConfig, DEFAULT_MAX_VALUE_SIZE, default_cache_dir};
pub use error::{CacheError, CacheResult};
pub use file::FileCache;
pub use key::{CacheKey, CacheNamespace};
pub use memory::InMemoryCache;
pub use noop::NoopCache;
pub use provider::{CacheProvider, CacheStats};
pub use store::{CachedValue, SchemaCacheStore, ttl_from_secs};
pub use traced::TracedCache;

use crate::constants::SERVICE_NAME;

/// Create a cache provider based on configuration
#[must_use]
pub fn create_cache(config: &CacheConfig) -> Arc<dyn CacheProvider> {
    match config.backend {
        CacheBackend::Noop => Arc::new(TracedCache::new(NoopCache::new(), SERVICE_NAME)),
        CacheBackend::Memory => {
            let mut cache = InMemoryCache::new().with_max_value_size(config.max_value_size);

            if let Some(max) = config.max_entries {
                cache = cache.with_max_entries(max);
            }

            Arc::new(TracedCache::new(cache, SERVICE_NAME))
        }
        CacheBackend::File => {
            let cache =
                FileCache::new(config.resolved_dir()).with_max_value_size(config.max_value_size);
            Arc::new(TracedCache::new(cache, SERVICE_NAME))
        }
    }
}
