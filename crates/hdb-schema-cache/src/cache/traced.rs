//! Traced cache wrapper for observability

use std::time::Duration;

use async_trait::async_trait;
use tracing::Instrument;

use super::error::CacheResult;
use super::key::CacheKey;
use super::provider::{CacheProvider, CacheStats};
use crate::identity::CacheTag;

/// Wrapper that adds tracing to any `CacheProvider`
///
/// Uses debug-level spans to avoid exposing cache keys in production logs.
/// Cache keys reveal table names and connection endpoints.
pub struct TracedCache<C> {
    inner: C,
    service_name: String,
}

impl<C: std::fmt::Debug> std::fmt::Debug for TracedCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedCache")
            .field("inner", &self.inner)
            .field("service_name", &self.service_name)
            .finish()
    }
}

impl<C: Clone> Clone for TracedCache<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            service_name: self.service_name.clone(),
        }
    }
}

impl<C> TracedCache<C> {
    pub fn new(cache: C, service_name: impl Into<String>) -> Self {
        Self {
            inner: cache,
            service_name: service_name.into(),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: CacheProvider> CacheProvider for TracedCache<C> {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        let span = tracing::debug_span!(
            "cache.get",
            cache.key = %key,
            cache.namespace = key.namespace().as_str(),
            service = %self.service_name,
            otel.name = "cache.get",
        );

        let result = self.inner.get(key).instrument(span).await;

        match &result {
            Ok(Some(data)) => {
                tracing::debug!(
                    cache.result = "hit",
                    cache.key = %key,
                    cache.size_bytes = data.len(),
                );
            }
            Ok(None) => {
                tracing::debug!(cache.result = "miss", cache.key = %key);
            }
            Err(e) => {
                tracing::warn!(cache.result = "error", cache.key = %key, error = %e);
            }
        }

        result
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &[u8],
        ttl: Option<Duration>,
        tag: &CacheTag,
    ) -> CacheResult<()> {
        let span = tracing::debug_span!(
            "cache.set",
            cache.key = %key,
            cache.tag = %tag,
            cache.namespace = key.namespace().as_str(),
            cache.value_size = value.len(),
            cache.ttl_secs = ttl.map(|d| d.as_secs()),
            service = %self.service_name,
            otel.name = "cache.set",
        );

        let result = self.inner.set(key, value, ttl, tag).instrument(span).await;

        if let Err(ref e) = result {
            tracing::warn!(
                cache.operation = "set",
                cache.key = %key,
                error = %e,
            );
        }

        result
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        let span = tracing::debug_span!(
            "cache.delete",
            cache.key = %key,
            cache.namespace = key.namespace().as_str(),
            service = %self.service_name,
            otel.name = "cache.delete",
        );

        let result = self.inner.delete(key).instrument(span).await;

        match &result {
            Ok(deleted) => {
                tracing::debug!(
                    cache.operation = "delete",
                    cache.key = %key,
                    cache.deleted = deleted,
                );
            }
            Err(e) => {
                tracing::warn!(
                    cache.operation = "delete",
                    cache.key = %key,
                    error = %e,
                );
            }
        }

        result
    }

    async fn exists(&self, key: &CacheKey) -> CacheResult<bool> {
        let span = tracing::debug_span!(
            "cache.exists",
            cache.key = %key,
            cache.namespace = key.namespace().as_str(),
            service = %self.service_name,
            otel.name = "cache.exists",
        );

        self.inner.exists(key).instrument(span).await
    }

    async fn invalidate_tag(&self, tag: &CacheTag) -> CacheResult<u64> {
        let span = tracing::debug_span!(
            "cache.invalidate_tag",
            cache.tag = %tag,
            service = %self.service_name,
            otel.name = "cache.invalidate_tag",
        );

        let result = self.inner.invalidate_tag(tag).instrument(span).await;

        match &result {
            Ok(count) => {
                tracing::debug!(
                    cache.operation = "invalidate_tag",
                    cache.tag = %tag,
                    cache.deleted_count = count,
                );
            }
            Err(e) => {
                tracing::warn!(
                    cache.operation = "invalidate_tag",
                    cache.tag = %tag,
                    error = %e,
                );
            }
        }

        result
    }

    async fn health_check(&self) -> CacheResult<()> {
        let span = tracing::debug_span!(
            "cache.health_check",
            service = %self.service_name,
            otel.name = "cache.health_check",
        );

        self.inner.health_check().instrument(span).await
    }

    async fn stats(&self) -> CacheStats {
        self.inner.stats().await
    }
}
