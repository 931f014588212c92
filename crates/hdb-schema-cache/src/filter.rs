//! Table name filtering applied during discovery

use std::sync::Arc;

use crate::Error;

/// Error raised by a user-supplied filter predicate
pub type FilterError = Box<dyn std::error::Error + Send + Sync>;

/// Predicate signature: `(table_name, schema_name) -> accept?`
pub type FilterFn = dyn Fn(&str, Option<&str>) -> Result<bool, FilterError> + Send + Sync;

/// Table name pattern: exact name or trailing-`*` prefix, case-insensitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    Exact(String),
    Prefix(String),
}

impl NamePattern {
    pub fn parse(pattern: &str) -> Result<Self, Error> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(Error::Config("Empty table name pattern".into()));
        }

        let (body, is_prefix) = pattern
            .strip_suffix('*')
            .map_or((pattern, false), |body| (body, true));

        if body.contains('*') {
            return Err(Error::Config(format!(
                "Invalid table name pattern: '{pattern}'. Only a trailing '*' is supported"
            )));
        }

        let body = body.to_uppercase();
        Ok(if is_prefix {
            Self::Prefix(body)
        } else {
            Self::Exact(body)
        })
    }

    #[must_use]
    pub fn matches(&self, table: &str) -> bool {
        let table = table.to_uppercase();
        match self {
            Self::Exact(name) => table == *name,
            Self::Prefix(prefix) => table.starts_with(prefix.as_str()),
        }
    }
}

/// Restricts which discovered tables take part in caching
///
/// Evaluated once per discovered table on every discovery pass. A predicate
/// error aborts discovery instead of silently skipping the table.
#[derive(Clone, Default)]
pub enum TableNameFilter {
    /// Accept every table (default)
    #[default]
    AcceptAll,
    /// Only accept tables matching one of the patterns
    Include(Vec<NamePattern>),
    /// Accept every table except those matching one of the patterns
    Exclude(Vec<NamePattern>),
    /// User-supplied predicate
    Predicate(Arc<FilterFn>),
}

impl std::fmt::Debug for TableNameFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AcceptAll => f.write_str("AcceptAll"),
            Self::Include(patterns) => f.debug_tuple("Include").field(patterns).finish(),
            Self::Exclude(patterns) => f.debug_tuple("Exclude").field(patterns).finish(),
            Self::Predicate(_) => f.write_str("Predicate(<fn>)"),
        }
    }
}

impl TableNameFilter {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str, Option<&str>) -> Result<bool, FilterError> + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Decide whether `table` in `schema` takes part in caching
    pub fn accepts(&self, table: &str, schema: Option<&str>) -> Result<bool, FilterError> {
        match self {
            Self::AcceptAll => Ok(true),
            Self::Include(patterns) => Ok(patterns.iter().any(|p| p.matches(table))),
            Self::Exclude(patterns) => Ok(!patterns.iter().any(|p| p.matches(table))),
            Self::Predicate(f) => f(table, schema),
        }
    }

    #[must_use]
    pub const fn is_accept_all(&self) -> bool {
        matches!(self, Self::AcceptAll)
    }

    /// Create a filter from configuration strings
    pub fn from_config(mode: &str, patterns: &[String]) -> Result<Self, Error> {
        let patterns = patterns
            .iter()
            .map(|p| NamePattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;

        match mode.to_lowercase().as_str() {
            "include" | "whitelist" | "allow" => {
                if patterns.is_empty() {
                    return Err(Error::Config(
                        "Include mode requires at least one table pattern".into(),
                    ));
                }
                Ok(Self::Include(patterns))
            }
            "exclude" | "blacklist" | "deny" => Ok(Self::Exclude(patterns)),
            "none" | "all" | "" => Ok(Self::AcceptAll),
            _ => Err(Error::Config(format!(
                "Invalid table filter mode: {mode}. Use 'include', 'exclude', or 'none'"
            ))),
        }
    }
}
