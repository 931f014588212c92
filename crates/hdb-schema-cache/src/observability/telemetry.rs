//! OTLP span export

use std::sync::OnceLock;

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};

use crate::Result;
use crate::config::TelemetryConfig;
use crate::error::Error;

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Tracer exporting over OTLP/gRPC, or `None` without a configured endpoint
pub fn otlp_tracer(config: &TelemetryConfig) -> Result<Option<SdkTracer>> {
    let Some(ref endpoint) = config.otlp_endpoint else {
        return Ok(None);
    };

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create OTLP exporter for {endpoint}: {e}")))?;

    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build();

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build();

    let tracer = provider.tracer(config.service_name.clone());
    if TRACER_PROVIDER.set(provider).is_err() {
        return Err(Error::Config("OTLP tracer already initialized".into()));
    }

    Ok(Some(tracer))
}

/// Flush pending spans
pub fn shutdown_telemetry() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        tracing::warn!(error = ?e, "Failed to flush OTLP spans");
    }
}
