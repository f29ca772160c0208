//! Telemetry error types.

use thiserror::Error;

/// Errors raised while bringing up or running the telemetry pipeline.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A configured level string did not parse.
    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    /// The log file could not be opened for writing.
    #[error("failed to open log file: {0}")]
    LogFile(String),

    /// The indexing sink did not answer the startup probe.
    #[error("log sink unreachable at {url}: {source}")]
    SinkUnreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Failed to initialize the span exporter.
    #[error("failed to initialize tracer: {0}")]
    TracerInit(String),

    /// Failed to initialize the metrics exporter.
    #[error("failed to initialize metrics: {0}")]
    MetricsInit(String),

    /// Failed to install the global subscriber.
    #[error("failed to set global subscriber: {0}")]
    SubscriberInit(String),
}
