//! Advisory diagnostics emitted by the engine
//!
//! Nothing in the engine depends on whether these events are observed.

use std::fmt;

use serde::Serialize;

use crate::cache::CacheError;
use crate::engine::BuildReport;
use crate::identity::TableIdentity;

/// Why a table was left out of a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The catalog reported no columns for the table
    NoColumns,
    /// Describing the table failed
    DescribeFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoColumns => f.write_str("no columns"),
            Self::DescribeFailed(e) => write!(f, "describe failed: {e}"),
        }
    }
}

/// Receiver of engine diagnostics; every method defaults to a no-op
pub trait DiagnosticHook: Send + Sync {
    fn table_cached(&self, _table: &TableIdentity) {}

    fn table_skipped(&self, _table: &TableIdentity, _reason: &SkipReason) {}

    fn cache_write_failed(&self, _table: &TableIdentity, _error: &CacheError) {}

    /// Fallback lookup missed the cache (verbose mode only)
    fn cache_miss(&self, _table: &TableIdentity) {}

    fn build_finished(&self, _report: &BuildReport) {}
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl DiagnosticHook for NoopDiagnostics {}

/// Logs events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticHook for TracingDiagnostics {
    fn table_cached(&self, table: &TableIdentity) {
        tracing::debug!(table = %table, "Table has been cached");
    }

    fn table_skipped(&self, table: &TableIdentity, reason: &SkipReason) {
        tracing::warn!(table = %table, reason = %reason, "Table skipped during schema cache build");
    }

    fn cache_write_failed(&self, table: &TableIdentity, error: &CacheError) {
        tracing::error!(table = %table, error = %error, "Schema cache write failed");
    }

    fn cache_miss(&self, table: &TableIdentity) {
        tracing::warn!(
            table = %table,
            "Schema cache not found for table; rebuild it with build_cache()"
        );
    }

    fn build_finished(&self, report: &BuildReport) {
        tracing::info!(
            cache.tag = %report.tag,
            cached = report.cached.len(),
            skipped = report.skipped.len(),
            "Schema cache build finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::NoColumns.to_string(), "no columns");
        assert_eq!(
            SkipReason::DescribeFailed("timeout".to_string()).to_string(),
            "describe failed: timeout"
        );
    }

    #[test]
    fn test_skip_reason_json() {
        let json = serde_json::to_value(SkipReason::DescribeFailed("boom".to_string())).unwrap();
        assert_eq!(json["reason"], "describe_failed");
        assert_eq!(json["detail"], "boom");

        let json = serde_json::to_value(SkipReason::NoColumns).unwrap();
        assert_eq!(json["reason"], "no_columns");
    }

    #[test]
    fn test_default_hooks_are_callable() {
        let table = TableIdentity::current_schema("T");
        let hook: &dyn DiagnosticHook = &NoopDiagnostics;
        hook.table_cached(&table);
        hook.table_skipped(&table, &SkipReason::NoColumns);
        hook.cache_miss(&table);

        let hook: &dyn DiagnosticHook = &TracingDiagnostics;
        hook.table_cached(&table);
        hook.cache_write_failed(&table, &CacheError::Timeout);
    }
}
