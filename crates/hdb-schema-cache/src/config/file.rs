//! TOML configuration file loading

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;
use crate::cache::CacheBackend;
use crate::filter::TableNameFilter;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./hdb-schema-cache.toml",
    "~/.config/hdb-schema-cache/config.toml",
    "/etc/hdb-schema-cache/config.toml",
];

/// Expand a leading `~` to `$HOME`; `None` when HOME is unset
fn expand_home(path_str: &str) -> Option<PathBuf> {
    if path_str.starts_with('~') {
        let home = std::env::var("HOME").ok()?;
        Some(PathBuf::from(path_str.replacen('~', &home, 1)))
    } else {
        Some(PathBuf::from(path_str))
    }
}

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    CONFIG_PATHS
        .iter()
        .filter_map(|path_str| expand_home(path_str))
        .find(|path| path.exists())
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    apply_file_config(builder, file_config)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    // Connection settings
    if let Some(conn) = config.connection {
        if let Some(url_str) = conn.url {
            let url = Url::parse(&url_str)
                .map_err(|e| crate::Error::Config(format!("Invalid connection URL: {e}")))?;
            builder = builder.connection_url(url);
        }

        if let Some(size) = conn.pool_size
            && let Some(nz) = NonZeroUsize::new(size)
        {
            builder = builder.pool_size(nz);
        }

        if let Some(timeout) = conn.query_timeout_secs {
            builder = builder.query_timeout(Duration::from_secs(timeout));
        }
    }

    // Schema cache settings
    if let Some(sc) = config.schema_cache {
        if let Some(schemas) = sc.caching_schemas {
            builder = builder.caching_schemas(schemas);
        }

        if let Some(tag) = sc.cache_tag {
            builder = builder.cache_tag(Some(tag));
        }

        if let Some(ttl) = sc.ttl_secs {
            builder = builder.ttl_secs(ttl);
        }

        if let Some(verbose) = sc.verbose {
            builder = builder.verbose(verbose);
        }

        if let Some(n) = sc.build_concurrency
            && let Some(nz) = NonZeroUsize::new(n)
        {
            builder = builder.build_concurrency(nz);
        }

        if let Some(filter_config) = sc.table_filter {
            let patterns = filter_config.patterns.unwrap_or_default();
            let mode = filter_config.mode.as_deref().unwrap_or("none");
            let filter = TableNameFilter::from_config(mode, &patterns)?;
            builder = builder.table_filter(filter);
        }
    }

    // Cache backend settings
    if let Some(cache) = config.cache {
        if let Some(backend_str) = cache.backend {
            let backend: CacheBackend = backend_str.parse()?;
            builder = builder.cache_backend(backend);
        }

        if let Some(max) = cache.max_entries {
            builder = builder.cache_max_entries(Some(max));
        }

        if let Some(max) = cache.max_value_size {
            builder = builder.cache_max_value_size(max);
        }

        if let Some(dir) = cache.dir {
            let dir = expand_home(&dir).ok_or_else(|| {
                crate::Error::Config(format!("Cannot expand cache dir {dir}: HOME is not set"))
            })?;
            builder = builder.cache_dir(dir);
        }
    }

    // Observability settings
    if let Some(obs) = config.observability {
        if let Some(endpoint) = obs.otlp_endpoint {
            builder = builder.otlp_endpoint(Some(endpoint));
        }

        if let Some(name) = obs.service_name {
            builder = builder.service_name(name);
        }

        if let Some(level) = obs.log_level {
            builder = builder.log_level(level);
        }

        if let Some(json) = obs.json_logs {
            builder = builder.json_logs(json);
        }
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    connection: Option<ConnectionConfig>,
    schema_cache: Option<SchemaCacheFileConfig>,
    cache: Option<CacheFileConfig>,
    observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Deserialize)]
struct ConnectionConfig {
    url: Option<String>,
    pool_size: Option<usize>,
    query_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SchemaCacheFileConfig {
    caching_schemas: Option<Vec<String>>,
    cache_tag: Option<String>,
    ttl_secs: Option<u64>,
    verbose: Option<bool>,
    build_concurrency: Option<usize>,
    table_filter: Option<TableFilterConfig>,
}

#[derive(Debug, Deserialize)]
struct TableFilterConfig {
    mode: Option<String>,
    patterns: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CacheFileConfig {
    backend: Option<String>,
    max_entries: Option<usize>,
    max_value_size: Option<usize>,
    dir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObservabilityConfig {
    otlp_endpoint: Option<String>,
    service_name: Option<String>,
    log_level: Option<String>,
    json_logs: Option<bool>,
}
