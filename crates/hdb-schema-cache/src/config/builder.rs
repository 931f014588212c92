//! Configuration builder

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use super::schema_cache::SchemaCacheConfig;
use crate::Error;
use crate::cache::{CacheBackend, CacheConfig};
use crate::constants::SERVICE_NAME;
use crate::filter::TableNameFilter;
use crate::identity::ConnectionIdentity;

/// Tool configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub connection_url: Url,
    pub pool_size: NonZeroUsize,
    pub query_timeout: Duration,
    pub schema_cache: SchemaCacheConfig,
    pub cache: CacheConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    #[must_use]
    pub const fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    #[must_use]
    pub const fn schema_cache(&self) -> &SchemaCacheConfig {
        &self.schema_cache
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    /// Endpoint and user of the configured connection
    #[must_use]
    pub fn connection_identity(&self) -> ConnectionIdentity {
        ConnectionIdentity::from_url(&self.connection_url)
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    pub log_level: String,
    pub json_logs: bool,
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    connection_url: Option<Url>,
    pool_size: NonZeroUsize,
    query_timeout: Duration,
    schema_cache: SchemaCacheConfig,
    cache: CacheConfig,
    telemetry: TelemetryConfig,
}

impl ConfigBuilder {
    const DEFAULT_POOL_SIZE: NonZeroUsize = NonZeroUsize::MIN.saturating_add(3); // 4

    #[must_use]
    pub const fn new() -> Self {
        let mut cache = CacheConfig::new();
        cache.backend = CacheBackend::File;

        Self {
            connection_url: None,
            pool_size: Self::DEFAULT_POOL_SIZE,
            query_timeout: Duration::from_secs(30),
            schema_cache: SchemaCacheConfig::new(),
            cache,
            telemetry: TelemetryConfig {
                otlp_endpoint: None,
                service_name: String::new(),
                log_level: String::new(),
                json_logs: false,
            },
        }
    }

    #[must_use]
    pub fn connection_url(mut self, url: Url) -> Self {
        self.connection_url = Some(url);
        self
    }

    #[must_use]
    pub const fn pool_size(mut self, size: NonZeroUsize) -> Self {
        self.pool_size = size;
        self
    }

    #[must_use]
    pub const fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    // Schema cache configuration methods

    /// Schemas to discover, in order (empty: current schema)
    #[must_use]
    pub fn caching_schemas(mut self, schemas: Vec<String>) -> Self {
        self.schema_cache.caching_schemas = schemas;
        self
    }

    /// Explicit cache tag (default: derived from the connection)
    #[must_use]
    pub fn cache_tag(mut self, tag: Option<String>) -> Self {
        self.schema_cache.cache_tag = tag;
        self
    }

    /// Entry lifetime in seconds; `0` never expires
    #[must_use]
    pub const fn ttl_secs(mut self, secs: u64) -> Self {
        self.schema_cache.ttl_secs = secs;
        self
    }

    #[must_use]
    pub fn table_filter(mut self, filter: TableNameFilter) -> Self {
        self.schema_cache.table_filter = filter;
        self
    }

    /// Report fallback lookups that missed the cache
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.schema_cache.verbose = verbose;
        self
    }

    #[must_use]
    pub const fn build_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.schema_cache.build_concurrency = concurrency;
        self
    }

    // Cache backend configuration methods

    #[must_use]
    pub const fn cache_backend(mut self, backend: CacheBackend) -> Self {
        self.cache.backend = backend;
        self
    }

    #[must_use]
    pub const fn cache_max_entries(mut self, max: Option<usize>) -> Self {
        self.cache.max_entries = max;
        self
    }

    /// Root directory of the file backend
    #[must_use]
    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache.dir = Some(dir);
        self
    }

    /// Set maximum value size for cache entries (default: 1MB)
    #[must_use]
    pub const fn cache_max_value_size(mut self, max: usize) -> Self {
        self.cache.max_value_size = max;
        self
    }

    // Telemetry configuration methods

    #[must_use]
    pub fn otlp_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.telemetry.otlp_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn service_name(mut self, name: String) -> Self {
        self.telemetry.service_name = name;
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: String) -> Self {
        self.telemetry.log_level = level;
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.telemetry.json_logs = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> crate::Result<Config> {
        let connection_url = self
            .connection_url
            .ok_or_else(|| Error::Config("connection_url is required".into()))?;

        self.schema_cache.validate()?;

        let service_name = if self.telemetry.service_name.is_empty() {
            SERVICE_NAME.to_string()
        } else {
            self.telemetry.service_name
        };

        let log_level = if self.telemetry.log_level.is_empty() {
            "info".to_string()
        } else {
            self.telemetry.log_level
        };

        Ok(Config {
            connection_url,
            pool_size: self.pool_size,
            query_timeout: self.query_timeout,
            schema_cache: self.schema_cache,
            cache: self.cache,
            telemetry: TelemetryConfig {
                otlp_endpoint: self.telemetry.otlp_endpoint,
                service_name,
                log_level,
                json_logs: self.telemetry.json_logs,
            },
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
