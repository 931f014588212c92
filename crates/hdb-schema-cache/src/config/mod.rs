//! Configuration management
//!
//! Supports configuration loading with precedence: env > file > CLI > defaults

mod builder;
mod env;
mod file;
mod schema_cache;

use std::path::Path;

pub use builder::{Config, ConfigBuilder, TelemetryConfig};
pub use schema_cache::SchemaCacheConfig;

use crate::Result;

/// Load configuration with precedence: env > file > defaults
pub fn load_config() -> Result<ConfigBuilder> {
    load_config_over(ConfigBuilder::new(), None)
}

/// Load configuration from a specific file path
pub fn load_config_from_path(path: &Path) -> Result<ConfigBuilder> {
    load_config_over(ConfigBuilder::new(), Some(path))
}

/// Layer file and environment settings over `base`.
///
/// Without `path` the default locations are searched; a missing file is not
/// an error there, but an explicit `path` must exist.
pub fn load_config_over(base: ConfigBuilder, path: Option<&Path>) -> Result<ConfigBuilder> {
    let mut builder = base;

    match path {
        Some(path) => builder = file::load_from_file(path, builder)?,
        None => {
            if let Some(path) = file::find_config_file() {
                tracing::info!("Loading configuration from {}", path.display());
                builder = file::load_from_file(&path, builder)?;
            }
        }
    }

    env::load_from_env(builder)
}
