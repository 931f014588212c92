//! Cache provider trait definition

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::error::CacheResult;
use super::key::CacheKey;
use crate::identity::CacheTag;

/// Counters reported by a backend
///
/// `size_bytes` and `entry_count` cover live entries only and are `None` for
/// backends that cannot report them cheaply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub invalidations: u64,
    pub errors: u64,
    pub size_bytes: Option<u64>,
    pub entry_count: Option<u64>,
}

impl CacheStats {
    /// Fraction of reads that hit, or `None` before the first read
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> Option<f64> {
        let reads = self.hits + self.misses;
        (reads > 0).then(|| self.hits as f64 / reads as f64)
    }
}

/// Async tagged key-value cache backend
///
/// Every write carries a [`CacheTag`]; [`invalidate_tag`](Self::invalidate_tag)
/// removes all entries written under a tag in one step, so no caller observes a
/// partially cleared tag. All operations are async to support network-based
/// backends.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Get a value by key; `Ok(None)` on miss
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>>;

    /// Store a value under `tag`, overwriting any previous value.
    /// `None` TTL means the entry never expires.
    async fn set(
        &self,
        key: &CacheKey,
        value: &[u8],
        ttl: Option<Duration>,
        tag: &CacheTag,
    ) -> CacheResult<()>;

    /// Delete a key; returns whether it was present
    async fn delete(&self, key: &CacheKey) -> CacheResult<bool>;

    /// Check if a key exists
    async fn exists(&self, key: &CacheKey) -> CacheResult<bool>;

    /// Delete every entry written under `tag`; returns the number removed
    async fn invalidate_tag(&self, tag: &CacheTag) -> CacheResult<u64>;

    /// Health check for the cache backend
    async fn health_check(&self) -> CacheResult<()>;

    /// Get cache statistics for observability
    async fn stats(&self) -> CacheStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_ratio() {
        assert_eq!(CacheStats::default().hit_ratio(), None);

        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_ratio(), Some(0.75));
    }

    #[test]
    fn test_stats_serialize_optional_sizes() {
        let json = serde_json::to_value(CacheStats::default()).unwrap();
        assert_eq!(json["hits"], 0);
        assert!(json["entry_count"].is_null());
    }
}
