//! Logging, span export and metrics setup for the binary
//!
//! Logs go to stderr; stdout is reserved for command output.

#[cfg(feature = "metrics")]
mod metrics;

#[cfg(feature = "telemetry")]
mod telemetry;

#[cfg(feature = "metrics")]
pub use metrics::{
    MetricsDiagnostics, init_metrics, record_build, record_cache_miss, record_table_cached,
    record_table_skipped, record_write_failure, render_metrics,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::Result;
use crate::config::TelemetryConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// `RUST_LOG` wins over the configured level
fn env_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

fn fmt_layer(config: &TelemetryConfig) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    if config.json_logs {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Install the global subscriber, plus the metrics recorder and OTLP exporter
/// when those features are enabled.
pub fn init_observability(config: &TelemetryConfig) -> Result<()> {
    #[cfg(feature = "metrics")]
    init_metrics()?;

    #[cfg_attr(not(feature = "telemetry"), allow(unused_mut))]
    let mut layers = vec![fmt_layer(config)];

    #[cfg(feature = "telemetry")]
    let otlp_enabled = if let Some(tracer) = telemetry::otlp_tracer(config)? {
        layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());
        true
    } else {
        false
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(config))
        .try_init()
        .map_err(|e| crate::Error::Config(format!("Failed to install tracing subscriber: {e}")))?;

    #[cfg(feature = "telemetry")]
    if otlp_enabled {
        tracing::info!(
            endpoint = config.otlp_endpoint.as_deref().unwrap_or_default(),
            "OTLP span export enabled"
        );
    }

    Ok(())
}

/// Flush exporters before exit
#[allow(clippy::missing_const_for_fn)]
pub fn shutdown_observability() {
    #[cfg(feature = "telemetry")]
    telemetry::shutdown_telemetry();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert!(config.otlp_endpoint.is_none());
        assert!(config.service_name.is_empty());
        assert!(config.log_level.is_empty());
        assert!(!config.json_logs);
    }

    #[test]
    fn test_fmt_layer_variants_build() {
        let plain = TelemetryConfig::default();
        let json = TelemetryConfig {
            json_logs: true,
            ..Default::default()
        };
        let _ = fmt_layer(&plain);
        let _ = fmt_layer(&json);
    }

    #[test]
    fn test_shutdown_observability_no_panic() {
        shutdown_observability();
    }
}
