//! Telemetry configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the whole telemetry pipeline: local log output,
/// the indexing/monitoring sinks, APM export, and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Default log level when `RUST_LOG` is unset (e.g. `"debug"`).
    pub level: String,
    /// Emit JSON instead of the human-readable format.
    pub json: bool,
    /// Write logs to a daily-rolled file at this path instead of stdout.
    pub log_file: Option<PathBuf>,
    /// Service name attached to exported spans.
    pub service_name: String,
    /// Log sink forwarding.
    pub forwarding: ForwardingConfig,
    /// OTLP endpoint for span export (e.g. `http://localhost:4317`).
    pub otlp_endpoint: Option<String>,
    /// Bind address for the Prometheus scrape endpoint.
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
            json: false,
            log_file: None,
            service_name: "concierge".to_string(),
            forwarding: ForwardingConfig::default(),
            otlp_endpoint: None,
            metrics_addr: None,
        }
    }
}

/// Configuration for shipping log records to remote sinks.
#[derive(Debug, Clone)]
pub struct ForwardingConfig {
    /// Base URL of the indexing sink (an Elasticsearch-compatible API).
    pub index_url: Option<String>,
    /// Index name prefix; the record date is appended per batch.
    pub index_prefix: String,
    /// URL that receives error-level records for alerting.
    pub monitoring_url: Option<String>,
    /// Minimum severity shipped to the sinks.
    pub min_level: String,
    /// Capacity of the in-process record queue. Records are dropped,
    /// not blocked on, when the queue is full.
    pub queue_capacity: usize,
    /// Records per bulk request.
    pub max_batch: usize,
    /// How often a partial batch is flushed.
    pub flush_interval: Duration,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            index_url: None,
            index_prefix: "concierge-".to_string(),
            monitoring_url: None,
            min_level: "debug".to_string(),
            queue_capacity: 1024,
            max_batch: 64,
            flush_interval: Duration::from_secs(2),
        }
    }
}

impl ForwardingConfig {
    /// Returns `true` when at least one sink is configured.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.index_url.is_some() || self.monitoring_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_debug() {
        let config = TelemetryConfig::default();
        assert_eq!(config.level, "debug");
        assert!(!config.json);
        assert!(config.log_file.is_none());
        assert_eq!(config.service_name, "concierge");
    }

    #[test]
    fn forwarding_disabled_without_sinks() {
        let config = ForwardingConfig::default();
        assert!(!config.enabled());
    }

    #[test]
    fn forwarding_enabled_with_either_sink() {
        let mut config = ForwardingConfig {
            index_url: Some("http://localhost:9200".to_string()),
            ..ForwardingConfig::default()
        };
        assert!(config.enabled());

        config.index_url = None;
        config.monitoring_url = Some("http://localhost:9999/alerts".to_string());
        assert!(config.enabled());
    }
}
