//! Cache key derivation
//!
//! Key layout:
//!
//! ```text
//! schema_cache:<tag>:tbl:<schema>:<table>     table descriptor
//! schema_cache:<tag>:meta:created_at          freshness record
//! ```
//!
//! `<schema>` is `~` for the current schema, otherwise the encoded schema
//! name. Names are encoded with the same scheme as tags, so no segment can
//! contain `:` or `~` and every key string maps back to exactly one
//! `(tag, table)` pair. Keys depend on nothing but their inputs and are stable
//! across process restarts.

use std::fmt;

use crate::identity::{CacheTag, TableIdentity, encode_segment};

const KEY_PREFIX: &str = "schema_cache";
const CURRENT_SCHEMA_SEGMENT: &str = "~";
const FRESHNESS_IDENTIFIER: &str = "created_at";

/// Key namespace inside a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Table descriptors
    TableSchema,
    /// Build completion timestamp
    Freshness,
}

impl CacheNamespace {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TableSchema => "tbl",
            Self::Freshness => "meta",
        }
    }
}

/// Structured cache key scoped to a [`CacheTag`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: CacheNamespace,
    tag: CacheTag,
    schema: Option<String>,
    identifier: String,
}

impl CacheKey {
    /// Key of a table descriptor
    #[must_use]
    pub fn table(tag: &CacheTag, table: &TableIdentity) -> Self {
        Self {
            namespace: CacheNamespace::TableSchema,
            tag: tag.clone(),
            schema: table.schema().map(ToString::to_string),
            identifier: table.table().to_string(),
        }
    }

    /// Key of the freshness record of a tag
    #[must_use]
    pub fn freshness(tag: &CacheTag) -> Self {
        Self {
            namespace: CacheNamespace::Freshness,
            tag: tag.clone(),
            schema: None,
            identifier: FRESHNESS_IDENTIFIER.to_string(),
        }
    }

    #[must_use]
    pub const fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    #[must_use]
    pub const fn tag(&self) -> &CacheTag {
        &self.tag
    }

    /// Convert to string key for storage
    #[must_use]
    pub fn to_key_string(&self) -> String {
        match self.namespace {
            CacheNamespace::TableSchema => {
                let schema = self
                    .schema
                    .as_deref()
                    .map_or_else(|| CURRENT_SCHEMA_SEGMENT.to_string(), encode_segment);
                format!(
                    "{KEY_PREFIX}:{}:{}:{schema}:{}",
                    self.tag,
                    self.namespace.as_str(),
                    encode_segment(&self.identifier)
                )
            }
            CacheNamespace::Freshness => format!(
                "{KEY_PREFIX}:{}:{}:{}",
                self.tag,
                self.namespace.as_str(),
                self.identifier
            ),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_key_string())
    }
}
