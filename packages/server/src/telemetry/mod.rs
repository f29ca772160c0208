//! Correlated logging, sink forwarding, APM export, and metrics.
//!
//! [`init`] wires the whole pipeline into one global subscriber: an
//! env-filter, a fmt layer (stdout or a daily-rolled file), the sink
//! layer feeding the [`forwarder`], and optionally an OTLP span layer.
//! The returned [`Telemetry`] handle owns everything that must be
//! flushed on the way out.

pub mod apm;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod layer;
pub mod metrics;
pub mod record;

pub use config::{ForwardingConfig, TelemetryConfig};
pub use error::TelemetryError;
pub use forwarder::SinkForwarder;
pub use record::LogRecord;

use std::path::Path;

use async_trait::async_trait;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::lifecycle::ManagedService;
use crate::telemetry::layer::SinkLayer;

/// Handle over the running pipeline. Shut down before process exit so
/// queued records, spans, and file buffers are flushed.
pub struct Telemetry {
    forwarder: Option<SinkForwarder>,
    tracer_provider: Option<TracerProvider>,
    // Flushes buffered file output when dropped.
    _file_guard: Option<WorkerGuard>,
}

impl Telemetry {
    /// Stops the forwarder (final flush included) and the span exporter.
    pub async fn shutdown(mut self) {
        if let Some(mut forwarder) = self.forwarder.take() {
            forwarder.stop().await;
        }
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(error) = provider.shutdown() {
                warn!(%error, "tracer provider shutdown failed");
            }
        }
    }
}

/// Initializes the global subscriber and every configured exporter.
///
/// When an indexing sink is configured it is probed first and an
/// unreachable sink fails startup; nothing is queued to a sink that was
/// never seen alive.
///
/// # Errors
///
/// Returns a [`TelemetryError`] when a level string does not parse, the
/// log file cannot be opened, the sink probe fails, an exporter cannot
/// be built, or a global subscriber is already installed.
pub async fn init(config: TelemetryConfig) -> Result<Telemetry, TelemetryError> {
    let sink_level = config
        .forwarding
        .min_level
        .parse::<Level>()
        .map_err(|_| TelemetryError::InvalidLevel(config.forwarding.min_level.clone()))?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|_| TelemetryError::InvalidLevel(config.level.clone()))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(env_filter.boxed());

    let mut file_guard = None;
    let fmt_layer = match &config.log_file {
        Some(path) => {
            let (writer, guard) = open_log_file(path)?;
            file_guard = Some(guard);
            if config.json {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .boxed()
            } else {
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .boxed()
            }
        }
        None => {
            if config.json {
                tracing_subscriber::fmt::layer().json().boxed()
            } else {
                tracing_subscriber::fmt::layer().boxed()
            }
        }
    };
    layers.push(fmt_layer);

    let mut sink_rx = None;
    if config.forwarding.enabled() {
        let (tx, rx) = mpsc::channel(config.forwarding.queue_capacity);
        layers.push(SinkLayer::new(tx, sink_level).boxed());
        sink_rx = Some(rx);
    }

    let mut tracer_provider = None;
    if let Some(endpoint) = &config.otlp_endpoint {
        let provider = apm::init_tracer(&config.service_name, endpoint)?;
        let tracer = provider.tracer("concierge");
        layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());
        tracer_provider = Some(provider);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    let mut forwarder = None;
    if let Some(rx) = sink_rx {
        let client = reqwest::Client::new();
        if let Some(url) = &config.forwarding.index_url {
            forwarder::probe_sink(&client, url).await?;
            info!(url = %url, "indexing sink reachable");
        }
        forwarder = Some(SinkForwarder::start(config.forwarding.clone(), client, rx));
    }

    if let Some(addr) = config.metrics_addr {
        metrics::install_exporter(addr)?;
        info!(%addr, "metrics exporter listening");
    }

    Ok(Telemetry {
        forwarder,
        tracer_provider,
        _file_guard: file_guard,
    })
}

/// Splits the configured path into directory and file name, then opens
/// a daily-rolled non-blocking writer there.
fn open_log_file(path: &Path) -> Result<(NonBlocking, WorkerGuard), TelemetryError> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| TelemetryError::LogFile(format!("invalid log path: {}", path.display())))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(|e| TelemetryError::LogFile(e.to_string()))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Lifecycle adapter so the pipeline is released with the other
/// services. The pipeline itself is brought up before any service
/// exists, so `init` here is a no-op.
pub struct TelemetryService {
    inner: tokio::sync::Mutex<Option<Telemetry>>,
}

impl TelemetryService {
    #[must_use]
    pub fn new(telemetry: Telemetry) -> Self {
        Self {
            inner: tokio::sync::Mutex::new(Some(telemetry)),
        }
    }
}

#[async_trait]
impl ManagedService for TelemetryService {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        if let Some(telemetry) = self.inner.lock().await.take() {
            telemetry.shutdown().await;
        }
        Ok(())
    }
}
