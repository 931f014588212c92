//! Build freshness tracking

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, CacheResult, SchemaCacheStore};
use crate::identity::CacheTag;

/// Wall-clock time of a completed cache build
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheTimestamp(SystemTime);

impl CacheTimestamp {
    #[must_use]
    pub fn now() -> Self {
        Self(SystemTime::now())
    }

    #[must_use]
    pub const fn from_system_time(time: SystemTime) -> Self {
        Self(time)
    }

    #[must_use]
    pub const fn as_system_time(&self) -> SystemTime {
        self.0
    }

    /// Seconds since the Unix epoch, with sub-second precision
    #[must_use]
    pub fn unix_seconds(&self) -> f64 {
        self.0
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64())
    }

    /// Time elapsed since this timestamp; zero if it lies in the future
    #[must_use]
    pub fn age(&self) -> Duration {
        self.0.elapsed().unwrap_or_default()
    }
}

/// Reads and writes the freshness record of one tag
///
/// The record is a single timestamp stored under [`CacheKey::freshness`] and
/// tagged like every table entry, so tag invalidation clears it too. Its
/// absence means "never built" or "invalidated since the last build".
#[derive(Debug, Clone)]
pub struct FreshnessTracker {
    store: SchemaCacheStore,
    tag: CacheTag,
    key: CacheKey,
    ttl_secs: u64,
}

impl FreshnessTracker {
    #[must_use]
    pub fn new(store: SchemaCacheStore, tag: CacheTag, ttl_secs: u64) -> Self {
        let key = CacheKey::freshness(&tag);
        Self {
            store,
            tag,
            key,
            ttl_secs,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Record "a build completed now"
    pub async fn mark_built(&self) -> CacheResult<CacheTimestamp> {
        let now = CacheTimestamp::now();
        self.store
            .set_timestamp(&self.key, &now, self.ttl_secs, &self.tag)
            .await?;
        Ok(now)
    }

    pub async fn built_at(&self) -> CacheResult<Option<CacheTimestamp>> {
        self.store.get_timestamp(&self.key).await
    }

    pub async fn is_built(&self) -> CacheResult<bool> {
        self.store.exists(&self.key).await
    }

    pub async fn clear(&self) -> CacheResult<bool> {
        self.store.delete(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::InMemoryCache;

    fn tracker() -> FreshnessTracker {
        let store = SchemaCacheStore::new(Arc::new(InMemoryCache::new()));
        FreshnessTracker::new(store, CacheTag::explicit("fresh").unwrap(), 0)
    }

    #[tokio::test]
    async fn test_never_built() {
        let tracker = tracker();
        assert!(!tracker.is_built().await.unwrap());
        assert!(tracker.built_at().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_built_round_trip() {
        let tracker = tracker();
        let before = CacheTimestamp::now();

        let marked = tracker.mark_built().await.unwrap();

        assert!(marked >= before);
        assert!(tracker.is_built().await.unwrap());
        assert_eq!(tracker.built_at().await.unwrap(), Some(marked));
    }

    #[tokio::test]
    async fn test_mark_built_overwrites() {
        let tracker = tracker();
        let first = tracker.mark_built().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = tracker.mark_built().await.unwrap();

        assert!(second > first);
        assert_eq!(tracker.built_at().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_clear() {
        let tracker = tracker();
        tracker.mark_built().await.unwrap();

        assert!(tracker.clear().await.unwrap());
        assert!(!tracker.is_built().await.unwrap());
        assert!(!tracker.clear().await.unwrap());
    }

    #[test]
    fn test_unix_seconds() {
        let ts = CacheTimestamp::from_system_time(UNIX_EPOCH + Duration::from_millis(1500));
        assert!((ts.unix_seconds() - 1.5).abs() < f64::EPSILON);
        assert_eq!(ts.as_system_time(), UNIX_EPOCH + Duration::from_millis(1500));
    }

    #[test]
    fn test_age_of_future_timestamp_is_zero() {
        let ts = CacheTimestamp::from_system_time(SystemTime::now() + Duration::from_secs(3600));
        assert_eq!(ts.age(), Duration::ZERO);
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let ts = CacheTimestamp::now();
        let json = serde_json::to_string(&ts).unwrap();
        let decoded: CacheTimestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, ts);
    }
}
