//! Prometheus metrics for schema cache builds and lookups

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::Result;
use crate::cache::CacheError;
use crate::diagnostics::{DiagnosticHook, SkipReason, TracingDiagnostics};
use crate::engine::BuildReport;
use crate::error::Error;
use crate::identity::TableIdentity;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const METRIC_INFO: &str = "hdb_schema_cache_info";
const METRIC_BUILDS: &str = "hdb_schema_cache_builds_total";
const METRIC_TABLES_CACHED: &str = "hdb_schema_cache_tables_cached_total";
const METRIC_TABLES_SKIPPED: &str = "hdb_schema_cache_tables_skipped_total";
const METRIC_WRITE_FAILURES: &str = "hdb_schema_cache_write_failures_total";
const METRIC_CACHE_MISSES: &str = "hdb_schema_cache_misses_total";
const METRIC_LAST_BUILD_TABLES: &str = "hdb_schema_cache_last_build_tables";

/// Initialize Prometheus metrics recorder.
pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {e}")))?;

    PROMETHEUS_HANDLE.set(handle).ok();

    register_metrics();
    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

fn register_metrics() {
    describe_gauge!(METRIC_INFO, "Tool information (always 1)");
    describe_counter!(METRIC_BUILDS, "Completed schema cache builds");
    describe_counter!(METRIC_TABLES_CACHED, "Tables written to the schema cache");
    describe_counter!(METRIC_TABLES_SKIPPED, "Tables skipped during builds");
    describe_counter!(METRIC_WRITE_FAILURES, "Schema cache writes that failed");
    describe_counter!(METRIC_CACHE_MISSES, "Fallback lookups that missed the cache");
    describe_gauge!(METRIC_LAST_BUILD_TABLES, "Tables handled by the last build");

    gauge!(
        METRIC_INFO,
        "version" => env!("CARGO_PKG_VERSION"),
    )
    .set(1.0);
}

/// Render metrics in Prometheus text format.
#[must_use]
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

pub fn record_table_cached() {
    counter!(METRIC_TABLES_CACHED).increment(1);
}

pub fn record_table_skipped(reason: &SkipReason) {
    let reason = match reason {
        SkipReason::NoColumns => "no_columns",
        SkipReason::DescribeFailed(_) => "describe_failed",
    };
    counter!(METRIC_TABLES_SKIPPED, "reason" => reason).increment(1);
}

pub fn record_write_failure() {
    counter!(METRIC_WRITE_FAILURES).increment(1);
}

pub fn record_cache_miss() {
    counter!(METRIC_CACHE_MISSES).increment(1);
}

/// Record a finished build.
#[allow(clippy::cast_precision_loss)]
pub fn record_build(cached: usize, skipped: usize) {
    counter!(METRIC_BUILDS).increment(1);
    gauge!(METRIC_LAST_BUILD_TABLES, "state" => "cached").set(cached as f64);
    gauge!(METRIC_LAST_BUILD_TABLES, "state" => "skipped").set(skipped as f64);
}

/// Records Prometheus counters, then logs through [`TracingDiagnostics`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsDiagnostics {
    log: TracingDiagnostics,
}

impl DiagnosticHook for MetricsDiagnostics {
    fn table_cached(&self, table: &TableIdentity) {
        record_table_cached();
        self.log.table_cached(table);
    }

    fn table_skipped(&self, table: &TableIdentity, reason: &SkipReason) {
        record_table_skipped(reason);
        self.log.table_skipped(table, reason);
    }

    fn cache_write_failed(&self, table: &TableIdentity, error: &CacheError) {
        record_write_failure();
        self.log.cache_write_failed(table, error);
    }

    fn cache_miss(&self, table: &TableIdentity) {
        record_cache_miss();
        self.log.cache_miss(table);
    }

    fn build_finished(&self, report: &BuildReport) {
        record_build(report.cached.len(), report.skipped.len());
        self.log.build_finished(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_metrics_without_init() {
        let output = render_metrics();
        assert!(output.is_empty());
    }

    #[test]
    fn test_hooks_without_recorder_are_noops() {
        let hook = MetricsDiagnostics::default();
        let table = TableIdentity::current_schema("T");
        hook.table_cached(&table);
        hook.table_skipped(&table, &SkipReason::NoColumns);
        hook.cache_miss(&table);
    }
}
