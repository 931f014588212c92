//! In-memory tagged cache with TTL support

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::config::DEFAULT_MAX_VALUE_SIZE;
use super::error::{CacheError, CacheResult};
use super::key::CacheKey;
use super::provider::{CacheProvider, CacheStats};
use crate::identity::CacheTag;

struct CacheEntry {
    value: Vec<u8>,
    tag: CacheTag,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|exp| now <= exp)
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    invalidations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

type Entries = HashMap<String, CacheEntry>;

/// Thread-safe in-memory cache with TTL and tag invalidation
///
/// Entries live in one map behind a `parking_lot` lock. Expired entries are
/// invisible to reads and are dropped lazily, on the next write that needs
/// room or the next read that trips over them.
///
/// [`invalidate_tag`](CacheProvider::invalidate_tag) removes a tag's entries
/// under the write lock, so concurrent readers see either all of them or none.
///
/// With `max_entries` set, a write into a full cache first purges expired
/// entries; if none expired, an arbitrary live entry is evicted.
#[derive(Clone)]
pub struct InMemoryCache {
    entries: Arc<RwLock<Entries>>,
    counters: Arc<Counters>,
    max_entries: Option<usize>,
    max_value_size: usize,
    default_ttl: Option<Duration>,
}

impl std::fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("max_entries", &self.max_entries)
            .field("max_value_size", &self.max_value_size)
            .field("default_ttl", &self.default_ttl)
            .field("entry_count", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::default(),
            counters: Arc::default(),
            max_entries: None,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
            default_ttl: None,
        }
    }

    #[must_use]
    pub const fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    #[must_use]
    pub const fn with_max_value_size(mut self, max: usize) -> Self {
        self.max_value_size = max;
        self
    }

    /// TTL applied to writes that do not specify one
    #[must_use]
    pub const fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Make room for `key` in a full cache
    fn make_room(&self, entries: &mut Entries, key: &str) {
        let Some(max) = self.max_entries else {
            return;
        };
        if entries.len() < max || entries.contains_key(key) {
            return;
        }

        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));

        if entries.len() >= max
            && let Some(victim) = entries.keys().next().cloned()
        {
            entries.remove(&victim);
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheProvider for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        let key = key.to_key_string();
        let now = Instant::now();

        let found = self.entries.read().get(&key).map(|entry| {
            entry.is_live(now).then(|| entry.value.clone())
        });

        match found {
            Some(Some(value)) => {
                Counters::bump(&self.counters.hits, 1);
                Ok(Some(value))
            }
            Some(None) => {
                // Expired; drop it unless a writer replaced it meanwhile
                let mut entries = self.entries.write();
                if entries.get(&key).is_some_and(|entry| !entry.is_live(now)) {
                    entries.remove(&key);
                }
                drop(entries);
                Counters::bump(&self.counters.misses, 1);
                Ok(None)
            }
            None => {
                Counters::bump(&self.counters.misses, 1);
                Ok(None)
            }
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &[u8],
        ttl: Option<Duration>,
        tag: &CacheTag,
    ) -> CacheResult<()> {
        if value.len() > self.max_value_size {
            return Err(CacheError::ValueTooLarge {
                size: value.len(),
                max: self.max_value_size,
            });
        }

        let key = key.to_key_string();
        let entry = CacheEntry {
            value: value.to_vec(),
            tag: tag.clone(),
            expires_at: ttl.or(self.default_ttl).map(|ttl| Instant::now() + ttl),
        };

        let mut entries = self.entries.write();
        self.make_room(&mut entries, &key);
        entries.insert(key, entry);
        drop(entries);

        Counters::bump(&self.counters.sets, 1);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        let removed = self.entries.write().remove(&key.to_key_string()).is_some();
        if removed {
            Counters::bump(&self.counters.deletes, 1);
        }
        Ok(removed)
    }

    async fn exists(&self, key: &CacheKey) -> CacheResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(&key.to_key_string())
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn invalidate_tag(&self, tag: &CacheTag) -> CacheResult<u64> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.tag != *tag);
        let removed = (before - entries.len()) as u64;
        drop(entries);

        Counters::bump(&self.counters.invalidations, 1);
        Counters::bump(&self.counters.deletes, removed);
        Ok(removed)
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let (entry_count, size_bytes) = self
            .entries
            .read()
            .values()
            .filter(|entry| entry.is_live(now))
            .fold((0u64, 0u64), |(count, bytes), entry| {
                (count + 1, bytes + entry.value.len() as u64)
            });

        let c = &self.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            sets: c.sets.load(Ordering::Relaxed),
            deletes: c.deletes.load(Ordering::Relaxed),
            invalidations: c.invalidations.load(Ordering::Relaxed),
            errors: 0,
            size_bytes: Some(size_bytes),
            entry_count: Some(entry_count),
        }
    }
}
