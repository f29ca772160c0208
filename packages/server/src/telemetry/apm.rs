//! OTLP span export.

use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, TracerProvider};
use opentelemetry_sdk::Resource;

use crate::telemetry::error::TelemetryError;

/// Builds the tracer provider, installs it globally, and registers the
/// W3C trace context propagator.
///
/// # Errors
///
/// Returns [`TelemetryError::TracerInit`] if the exporter cannot be
/// built for the given endpoint.
pub fn init_tracer(service_name: &str, endpoint: &str) -> Result<TracerProvider, TelemetryError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    let resource = Resource::new(vec![KeyValue::new(
        opentelemetry_semantic_conventions::attribute::SERVICE_NAME,
        service_name.to_string(),
    )]);

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    global::set_text_map_propagator(TraceContextPropagator::new());
    global::set_tracer_provider(provider.clone());
    Ok(provider)
}
