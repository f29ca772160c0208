//! Metric names and the Prometheus scrape endpoint.

use std::net::SocketAddr;

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::telemetry::error::TelemetryError;

pub const HTTP_REQUESTS_TOTAL: &str = "concierge_http_requests_total";
pub const GUEST_VISITS_TOTAL: &str = "concierge_guest_visits_total";

/// Installs the Prometheus recorder with an HTTP scrape listener.
///
/// Must be called from within a tokio runtime; the listener runs as a
/// spawned task.
///
/// # Errors
///
/// Returns [`TelemetryError::MetricsInit`] if the recorder is already
/// installed or the listener cannot bind.
pub fn install_exporter(addr: SocketAddr) -> Result<(), TelemetryError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    register_metrics();
    Ok(())
}

/// Register metric descriptions. Called once during telemetry startup.
fn register_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests handled");
    describe_counter!(GUEST_VISITS_TOTAL, "Total guest visits recorded");
}
