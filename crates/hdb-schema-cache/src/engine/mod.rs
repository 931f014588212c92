//! Schema cache engine
//!
//! Orchestrates discovery, bulk builds, lookups with live fallback and
//! freshness tracking for a single [`CacheTag`].
//!
//! # Build protocol
//!
//! 1. The tag is invalidated before anything is written, so entries from an
//!    older build never mix with the new one. Readers may see an empty cache
//!    until the build repopulates it and fall back to the live catalog
//!    meanwhile.
//! 2. Tables are described with up to `build_concurrency` describes in flight.
//!    A table that fails to describe, or has no columns, is skipped and
//!    reported through the [`DiagnosticHook`]; its siblings carry on.
//! 3. Each described table is written under its [`CacheKey`]. A write failure
//!    aborts the build with [`Error::Store`].
//! 4. Once every table has been handled, the freshness record is written. It
//!    means "a build ran", not "every table was cached".
//!
//! The engine does no locking of its own. Two concurrent builds for the same
//! tag interleave and the last write per key wins; callers that need mutual
//! exclusion must take a lock around [`SchemaCacheEngine::build_cache`].


use std::num::NonZeroUsize;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::cache::{CacheKey, SchemaCacheStore};
use crate::config::SchemaCacheConfig;
use crate::descriptor::TableDescriptor;
use crate::diagnostics::{DiagnosticHook, SkipReason, TracingDiagnostics};
use crate::filter::TableNameFilter;
use crate::freshness::{CacheTimestamp, FreshnessTracker};
use crate::identity::{CacheTag, ConnectionIdentity, TableIdentity};
use crate::probe::CatalogProbe;
use crate::{Error, Result};

/// Default number of tables described concurrently during a build
pub const DEFAULT_BUILD_CONCURRENCY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(3); // 4

/// Table left out of a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTable {
    pub table: TableIdentity,
    pub reason: SkipReason,
}

/// Outcome of a successful build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub tag: CacheTag,
    /// Cached tables, in discovery order
    pub cached: Vec<TableIdentity>,
    pub skipped: Vec<SkippedTable>,
    pub built_at: CacheTimestamp,
}

impl BuildReport {
    /// True when no table was skipped
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    #[must_use]
    pub fn discovered(&self) -> usize {
        self.cached.len() + self.skipped.len()
    }
}

/// Result of [`SchemaCacheEngine::lookup`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lookup {
    pub descriptor: Option<TableDescriptor>,
    /// Whether `descriptor` came from the cache rather than the live catalog
    pub from_cache: bool,
}

impl Lookup {
    const fn hit(descriptor: TableDescriptor) -> Self {
        Self {
            descriptor: Some(descriptor),
            from_cache: true,
        }
    }

    const fn live(descriptor: Option<TableDescriptor>) -> Self {
        Self {
            descriptor,
            from_cache: false,
        }
    }
}

/// Schema cache engine bound to one tag
pub struct SchemaCacheEngine {
    probe: Arc<dyn CatalogProbe>,
    store: SchemaCacheStore,
    tag: CacheTag,
    ttl_secs: u64,
    caching_schemas: Vec<String>,
    filter: TableNameFilter,
    verbose: bool,
    build_concurrency: NonZeroUsize,
    diagnostics: Arc<dyn DiagnosticHook>,
}

impl std::fmt::Debug for SchemaCacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCacheEngine")
            .field("tag", &self.tag)
            .field("ttl_secs", &self.ttl_secs)
            .field("caching_schemas", &self.caching_schemas)
            .field("filter", &self.filter)
            .field("verbose", &self.verbose)
            .field("build_concurrency", &self.build_concurrency)
            .finish_non_exhaustive()
    }
}

impl SchemaCacheEngine {
    /// Engine with no expiry, current-schema discovery, no filter and
    /// `tracing` diagnostics.
    pub fn new(probe: Arc<dyn CatalogProbe>, store: SchemaCacheStore, tag: CacheTag) -> Self {
        Self {
            probe,
            store,
            tag,
            ttl_secs: 0,
            caching_schemas: Vec::new(),
            filter: TableNameFilter::AcceptAll,
            verbose: false,
            build_concurrency: DEFAULT_BUILD_CONCURRENCY,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Build an engine from configuration, resolving the tag from
    /// `identity` when none is configured.
    pub fn from_config(
        probe: Arc<dyn CatalogProbe>,
        store: SchemaCacheStore,
        config: &SchemaCacheConfig,
        identity: &ConnectionIdentity,
    ) -> Result<Self> {
        config.validate()?;
        let tag = config.resolve_tag(identity)?;

        Ok(Self::new(probe, store, tag)
            .with_ttl_secs(config.ttl_secs)
            .with_caching_schemas(config.caching_schemas.clone())
            .with_filter(config.table_filter.clone())
            .with_verbose(config.verbose)
            .with_build_concurrency(config.build_concurrency))
    }

    /// `0` means entries never expire
    #[must_use]
    pub const fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Schemas to discover, in order; empty means the current schema
    #[must_use]
    pub fn with_caching_schemas(mut self, schemas: Vec<String>) -> Self {
        self.caching_schemas = schemas;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: TableNameFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Report fallback lookups through [`DiagnosticHook::cache_miss`]
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub const fn with_build_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.build_concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticHook>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    #[must_use]
    pub const fn tag(&self) -> &CacheTag {
        &self.tag
    }

    #[must_use]
    pub const fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    #[must_use]
    pub fn caching_schemas(&self) -> &[String] {
        &self.caching_schemas
    }

    #[must_use]
    pub const fn store(&self) -> &SchemaCacheStore {
        &self.store
    }

    fn freshness(&self) -> FreshnessTracker {
        FreshnessTracker::new(self.store.clone(), self.tag.clone(), self.ttl_secs)
    }

    /// List the tables that take part in caching, straight from the catalog.
    ///
    /// Schemas are visited in configured order and each schema keeps the
    /// probe's listing order. Identical names from repeated schema entries are
    /// kept as they are.
    pub async fn discover_tables(&self) -> Result<Vec<TableIdentity>> {
        let mut tables = Vec::new();

        if self.caching_schemas.is_empty() {
            self.discover_in(None, &mut tables).await?;
        } else {
            for schema in &self.caching_schemas {
                self.discover_in(Some(schema), &mut tables).await?;
            }
        }

        Ok(tables)
    }

    async fn discover_in(&self, schema: Option<&str>, out: &mut Vec<TableIdentity>) -> Result<()> {
        let names = self
            .probe
            .list_table_names(schema)
            .await
            .map_err(|e| Error::discovery(schema, e))?;

        for name in names {
            let table = TableIdentity::new(schema, &name);
            let accepted = self
                .filter
                .accepts(&name, schema)
                .map_err(|e| Error::Filter {
                    table: table.clone(),
                    reason: e.to_string(),
                })?;

            if accepted {
                out.push(table);
            }
        }

        Ok(())
    }

    /// Rebuild the cache for this tag from the live catalog.
    pub async fn build_cache(&self) -> Result<BuildReport> {
        let removed = self.store.invalidate_by_tag(&self.tag).await?;
        tracing::debug!(cache.tag = %self.tag, removed, "Schema cache invalidated before build");

        let tables = self.discover_tables().await?;
        tracing::debug!(
            cache.tag = %self.tag,
            tables = tables.len(),
            concurrency = self.build_concurrency.get(),
            "Building schema cache"
        );

        let mut cached = Vec::with_capacity(tables.len());
        let mut skipped = Vec::new();

        let mut described = stream::iter(tables)
            .map(|table| async move {
                let outcome = self.probe.describe_table(&table).await;
                (table, outcome)
            })
            .buffered(self.build_concurrency.get());

        while let Some((table, outcome)) = described.next().await {
            let reason = match outcome {
                Ok(Some(descriptor)) => {
                    let key = CacheKey::table(&self.tag, &table);
                    if let Err(e) = self
                        .store
                        .set_table(&key, &descriptor, self.ttl_secs, &self.tag)
                        .await
                    {
                        self.diagnostics.cache_write_failed(&table, &e);
                        return Err(e.into());
                    }
                    self.diagnostics.table_cached(&table);
                    cached.push(table);
                    continue;
                }
                Ok(None) => SkipReason::NoColumns,
                Err(e) => SkipReason::DescribeFailed(e.to_string()),
            };

            self.diagnostics.table_skipped(&table, &reason);
            skipped.push(SkippedTable { table, reason });
        }

        let built_at = self.freshness().mark_built().await?;

        let report = BuildReport {
            tag: self.tag.clone(),
            cached,
            skipped,
            built_at,
        };
        self.diagnostics.build_finished(&report);

        Ok(report)
    }

    /// Look a table up in the cache, falling back to the live catalog on a
    /// miss unless `cache_only` is set.
    ///
    /// Cache read failures count as misses. Only a failing live describe is
    /// an error.
    pub async fn lookup(&self, table: &TableIdentity, cache_only: bool) -> Result<Lookup> {
        let key = CacheKey::table(&self.tag, table);

        match self.store.get_table(&key).await {
            Ok(Some(descriptor)) => return Ok(Lookup::hit(descriptor)),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    table = %table,
                    error = %e,
                    "Schema cache read failed, treating as miss"
                );
            }
        }

        if cache_only {
            return Ok(Lookup::live(None));
        }

        if self.verbose {
            self.diagnostics.cache_miss(table);
        }

        let descriptor = self
            .probe
            .describe_table(table)
            .await
            .map_err(|e| Error::describe(table, e))?;

        Ok(Lookup::live(descriptor))
    }

    /// Cached descriptor if present, otherwise the live one
    pub async fn load_table_schema(&self, table: &TableIdentity) -> Result<Option<TableDescriptor>> {
        Ok(self.lookup(table, false).await?.descriptor)
    }

    /// Whether a build has completed since the last invalidation
    pub async fn is_cached(&self) -> bool {
        self.freshness().is_built().await.unwrap_or_else(|e| {
            tracing::warn!(cache.tag = %self.tag, error = %e, "Freshness check failed");
            false
        })
    }

    /// Completion time of the last build, if the cache is built
    pub async fn cache_time(&self) -> Option<CacheTimestamp> {
        self.freshness().built_at().await.unwrap_or_else(|e| {
            tracing::warn!(cache.tag = %self.tag, error = %e, "Freshness read failed");
            None
        })
    }

    /// Cached descriptors of the currently discoverable tables.
    ///
    /// Discovery runs live; tables missing from the cache are left out.
    pub async fn list_cached_tables(&self) -> Result<Vec<TableDescriptor>> {
        let mut result = Vec::new();

        for table in self.discover_tables().await? {
            if let Some(descriptor) = self.lookup(&table, true).await?.descriptor {
                result.push(descriptor);
            }
        }

        Ok(result)
    }

    /// Drop every entry of this tag, including the freshness record
    pub async fn invalidate(&self) -> Result<u64> {
        Ok(self.store.invalidate_by_tag(&self.tag).await?)
    }
}
