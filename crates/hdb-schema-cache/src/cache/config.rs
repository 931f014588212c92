//! Backend selection and limits

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

/// Largest encoded descriptor a backend accepts by default (1 MiB)
pub const DEFAULT_MAX_VALUE_SIZE: usize = 1_048_576;

const CACHE_DIR_NAME: &str = "hdb-schema-cache";

/// Storage backend for the schema cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    /// Stores nothing; every lookup misses
    Noop,
    /// Process-local map with per-entry expiry
    #[default]
    Memory,
    /// One directory per tag on local disk; survives restarts
    File,
}

impl CacheBackend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Memory => "memory",
            Self::File => "file",
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" | "in-memory" => Ok(Self::Memory),
            "noop" | "none" | "disabled" => Ok(Self::Noop),
            "file" | "disk" => Ok(Self::File),
            other => Err(Error::Config(format!(
                "Unknown cache backend '{other}' (expected memory, file or noop)"
            ))),
        }
    }
}

/// Backend selection plus per-backend limits and location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Entry cap for the in-memory backend; `None` is unbounded
    pub max_entries: Option<usize>,
    pub max_value_size: usize,
    /// Root of the file backend; `None` uses [`default_cache_dir`]
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            backend: CacheBackend::Memory,
            max_entries: None,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
            dir: None,
        }
    }

    /// Directory the file backend writes to
    #[must_use]
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_cache_dir)
    }
}

/// `$XDG_CACHE_HOME/hdb-schema-cache`, else `$HOME/.cache/hdb-schema-cache`,
/// else `.hdb-schema-cache` in the working directory
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .filter(|v| !v.is_empty())
                .map(|home| PathBuf::from(home).join(".cache"))
        });

    base.map_or_else(
        || PathBuf::from(format!(".{CACHE_DIR_NAME}")),
        |base| base.join(CACHE_DIR_NAME),
    )
}
