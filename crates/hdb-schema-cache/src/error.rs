use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheError;
use crate::identity::TableIdentity;

#[derive(Error, Debug)]
pub enum Error {
    #[cfg(feature = "hana")]
    #[error("Connection error: {0}")]
    Connection(#[from] hdbconnect::HdbError),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query timeout after {0:?}")]
    QueryTimeout(Duration),

    #[error("Table discovery failed in {}: {source}", schema.as_deref().unwrap_or("current schema"))]
    Discovery {
        schema: Option<String>,
        #[source]
        source: Box<Error>,
    },

    #[error("Describe failed for {table}: {source}")]
    Describe {
        table: TableIdentity,
        #[source]
        source: Box<Error>,
    },

    #[error("Table name filter failed for {table}: {reason}")]
    Filter { table: TableIdentity, reason: String },

    #[error("Schema cache store error: {0}")]
    Store(#[from] CacheError),
}

impl Error {
    pub(crate) fn discovery(schema: Option<&str>, source: Self) -> Self {
        Self::Discovery {
            schema: schema.map(ToString::to_string),
            source: Box::new(source),
        }
    }

    pub(crate) fn describe(table: &TableIdentity, source: Self) -> Self {
        Self::Describe {
            table: table.clone(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::QueryTimeout(_))
    }

    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Driver failure, such as a refused connection or rejected credentials
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        #[cfg(feature = "hana")]
        {
            matches!(self, Self::Connection(_))
        }

        #[cfg(not(feature = "hana"))]
        {
            false
        }
    }

    #[must_use]
    pub const fn is_pool_exhausted(&self) -> bool {
        matches!(self, Self::PoolExhausted)
    }

    #[must_use]
    pub const fn is_discovery(&self) -> bool {
        matches!(self, Self::Discovery { .. })
    }

    #[must_use]
    pub const fn is_describe(&self) -> bool {
        matches!(self, Self::Describe { .. })
    }

    #[must_use]
    pub const fn is_filter(&self) -> bool {
        matches!(self, Self::Filter { .. })
    }

    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_predicate() {
        let err = Error::QueryTimeout(Duration::from_secs(30));
        assert!(err.is_timeout());
        assert!(!err.is_config());
    }

    #[test]
    fn test_config_predicate() {
        let err = Error::Config("invalid tag".to_string());
        assert!(err.is_config());
        assert!(!err.is_store());
    }

    #[test]
    fn test_pool_exhausted_predicate() {
        let err = Error::PoolExhausted;
        assert!(err.is_pool_exhausted());
        assert!(!err.is_config());
        assert!(!err.is_connection());
    }

    #[test]
    fn test_pool_error_is_not_exhaustion() {
        let err = Error::Pool("Timed out during connection Create".to_string());
        assert!(!err.is_pool_exhausted());
        assert!(err.to_string().contains("Create"));
    }

    #[test]
    fn test_discovery_display_current_schema() {
        let err = Error::discovery(None, Error::Query("table not found".to_string()));
        assert!(err.is_discovery());
        let msg = err.to_string();
        assert!(msg.contains("current schema"));
        assert!(msg.contains("table not found"));
    }

    #[test]
    fn test_discovery_display_named_schema() {
        let err = Error::discovery(Some("SALES"), Error::PoolExhausted);
        assert!(err.to_string().contains("SALES"));
    }

    #[test]
    fn test_describe_display() {
        let table = TableIdentity::new(Some("APP"), "ORDERS");
        let err = Error::describe(&table, Error::QueryTimeout(Duration::from_secs(5)));
        assert!(err.is_describe());
        assert!(err.to_string().contains("APP.ORDERS"));
    }

    #[test]
    fn test_describe_source_chain() {
        use std::error::Error as _;

        let table = TableIdentity::new(None, "ORDERS");
        let err = Error::describe(&table, Error::Query("boom".to_string()));
        let source = err.source().expect("describe error carries a source");
        assert!(source.to_string().contains("boom"));
    }

    #[test]
    fn test_filter_display() {
        let err = Error::Filter {
            table: TableIdentity::new(None, "T1"),
            reason: "predicate exploded".to_string(),
        };
        assert!(err.is_filter());
        assert!(err.to_string().contains("predicate exploded"));
    }

    #[test]
    fn test_store_from_cache_error() {
        let err: Error = CacheError::Connection("refused".to_string()).into();
        assert!(err.is_store());
        assert!(err.to_string().contains("refused"));
    }
}
