//! No-op cache implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheResult;
use super::key::CacheKey;
use super::provider::{CacheProvider, CacheStats};
use crate::identity::CacheTag;

/// No-op cache implementation that never stores
///
/// With this backend every lookup is a miss, so the engine always falls back
/// to the live catalog.
#[derive(Debug, Clone, Default)]
pub struct NoopCache {
    misses: Arc<AtomicU64>,
}

impl NoopCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheProvider for NoopCache {
    async fn get(&self, _key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(
        &self,
        _key: &CacheKey,
        _value: &[u8],
        _ttl: Option<Duration>,
        _tag: &CacheTag,
    ) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &CacheKey) -> CacheResult<bool> {
        Ok(false)
    }

    async fn exists(&self, _key: &CacheKey) -> CacheResult<bool> {
        Ok(false)
    }

    async fn invalidate_tag(&self, _tag: &CacheTag) -> CacheResult<u64> {
        Ok(0)
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::TableIdentity;

    fn key() -> (CacheTag, CacheKey) {
        let tag = CacheTag::explicit("noop").unwrap();
        let key = CacheKey::table(&tag, &TableIdentity::new(Some("test"), "users"));
        (tag, key)
    }

    #[tokio::test]
    async fn test_noop_set_then_get_is_miss() {
        let cache = NoopCache::new();
        let (tag, key) = key();

        cache
            .set(&key, b"test data", Some(Duration::from_secs(60)), &tag)
            .await
            .unwrap();
        assert!(cache.get(&key).await.unwrap().is_none());
        assert!(!cache.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_noop_delete_returns_false() {
        let cache = NoopCache::new();
        let (_, key) = key();
        assert!(!cache.delete(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_noop_invalidate_returns_zero() {
        let cache = NoopCache::new();
        let (tag, _) = key();
        assert_eq!(cache.invalidate_tag(&tag).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_noop_health_check_succeeds() {
        assert!(NoopCache::new().health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_noop_clone_shares_stats() {
        let cache = NoopCache::new();
        let (_, key) = key();

        let cache_clone = cache.clone();
        cache.get(&key).await.unwrap();
        cache_clone.get(&key).await.unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 0);
    }
}
