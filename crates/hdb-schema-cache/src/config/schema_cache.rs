//! Schema cache engine settings

use std::num::NonZeroUsize;

use crate::Result;
use crate::engine::DEFAULT_BUILD_CONCURRENCY;
use crate::filter::TableNameFilter;
use crate::identity::{CacheTag, ConnectionIdentity};
use crate::validation::validate_catalog_name;

/// Settings consumed by [`SchemaCacheEngine::from_config`](crate::SchemaCacheEngine::from_config)
#[derive(Debug, Clone)]
pub struct SchemaCacheConfig {
    /// Schemas to discover in order; empty means the current schema
    pub caching_schemas: Vec<String>,
    /// Explicit tag; derived from the connection identity when `None`
    pub cache_tag: Option<String>,
    /// Entry lifetime in seconds; `0` disables expiry
    pub ttl_secs: u64,
    pub table_filter: TableNameFilter,
    pub verbose: bool,
    pub build_concurrency: NonZeroUsize,
}

impl SchemaCacheConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            caching_schemas: Vec::new(),
            cache_tag: None,
            ttl_secs: 0,
            table_filter: TableNameFilter::AcceptAll,
            verbose: false,
            build_concurrency: DEFAULT_BUILD_CONCURRENCY,
        }
    }

    /// Check schema names and the explicit tag
    pub fn validate(&self) -> Result<()> {
        for schema in &self.caching_schemas {
            validate_catalog_name(schema, "caching schema")?;
        }

        if let Some(ref tag) = self.cache_tag {
            CacheTag::explicit(tag)?;
        }

        Ok(())
    }

    pub fn resolve_tag(&self, identity: &ConnectionIdentity) -> Result<CacheTag> {
        CacheTag::resolve(self.cache_tag.as_deref(), identity)
    }
}

impl Default for SchemaCacheConfig {
    fn default() -> Self {
        Self::new()
    }
}
