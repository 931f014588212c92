//! Typed schema cache store over a [`CacheProvider`]

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{CacheError, CacheResult};
use super::key::CacheKey;
use super::provider::{CacheProvider, CacheStats};
use crate::descriptor::TableDescriptor;
use crate::freshness::CacheTimestamp;
use crate::identity::CacheTag;

/// Value stored in the schema cache
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachedValue {
    Table(TableDescriptor),
    BuiltAt(CacheTimestamp),
}

/// Borrowed twin of [`CachedValue`] with the same wire form
#[derive(Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
enum CachedValueRef<'a> {
    Table(&'a TableDescriptor),
    BuiltAt(&'a CacheTimestamp),
}

/// Convert a TTL in seconds to a backend TTL; `0` means never expire.
#[must_use]
pub const fn ttl_from_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

/// Schema cache store
///
/// Encodes [`CachedValue`]s as JSON and forwards them to the backend. Misses
/// are `Ok(None)`; backend failures are returned to the caller unchanged.
#[derive(Clone)]
pub struct SchemaCacheStore {
    provider: Arc<dyn CacheProvider>,
}

impl std::fmt::Debug for SchemaCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCacheStore").finish_non_exhaustive()
    }
}

impl SchemaCacheStore {
    pub fn new(provider: Arc<dyn CacheProvider>) -> Self {
        Self { provider }
    }

    pub async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedValue>> {
        let Some(bytes) = self.provider.get(key).await? else {
            return Ok(None);
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| CacheError::Deserialization(format!("{key}: {e}")))
    }

    pub async fn get_table(&self, key: &CacheKey) -> CacheResult<Option<TableDescriptor>> {
        match self.get(key).await? {
            Some(CachedValue::Table(table)) => Ok(Some(table)),
            Some(CachedValue::BuiltAt(_)) => Err(CacheError::Deserialization(format!(
                "{key}: expected a table descriptor, found a timestamp"
            ))),
            None => Ok(None),
        }
    }

    pub async fn get_timestamp(&self, key: &CacheKey) -> CacheResult<Option<CacheTimestamp>> {
        match self.get(key).await? {
            Some(CachedValue::BuiltAt(ts)) => Ok(Some(ts)),
            Some(CachedValue::Table(_)) => Err(CacheError::Deserialization(format!(
                "{key}: expected a timestamp, found a table descriptor"
            ))),
            None => Ok(None),
        }
    }

    pub async fn set_table(
        &self,
        key: &CacheKey,
        table: &TableDescriptor,
        ttl_secs: u64,
        tag: &CacheTag,
    ) -> CacheResult<()> {
        self.write(key, &CachedValueRef::Table(table), ttl_secs, tag)
            .await
    }

    pub async fn set_timestamp(
        &self,
        key: &CacheKey,
        ts: &CacheTimestamp,
        ttl_secs: u64,
        tag: &CacheTag,
    ) -> CacheResult<()> {
        self.write(key, &CachedValueRef::BuiltAt(ts), ttl_secs, tag)
            .await
    }

    /// Write any [`CachedValue`]
    pub async fn set(
        &self,
        key: &CacheKey,
        value: &CachedValue,
        ttl_secs: u64,
        tag: &CacheTag,
    ) -> CacheResult<()> {
        match value {
            CachedValue::Table(table) => self.set_table(key, table, ttl_secs, tag).await,
            CachedValue::BuiltAt(ts) => self.set_timestamp(key, ts, ttl_secs, tag).await,
        }
    }

    async fn write(
        &self,
        key: &CacheKey,
        value: &CachedValueRef<'_>,
        ttl_secs: u64,
        tag: &CacheTag,
    ) -> CacheResult<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| CacheError::Serialization(format!("{key}: {e}")))?;
        self.provider
            .set(key, &bytes, ttl_from_secs(ttl_secs), tag)
            .await
    }

    /// Delete a key; deleting an absent key is not an error
    pub async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        self.provider.delete(key).await
    }

    pub async fn exists(&self, key: &CacheKey) -> CacheResult<bool> {
        self.provider.exists(key).await
    }

    /// Remove every entry written under `tag`
    pub async fn invalidate_by_tag(&self, tag: &CacheTag) -> CacheResult<u64> {
        self.provider.invalidate_tag(tag).await
    }

    pub async fn stats(&self) -> CacheStats {
        self.provider.stats().await
    }
}
