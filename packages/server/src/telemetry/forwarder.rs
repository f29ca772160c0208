//! Background forwarder that ships queued log records to the sinks.

use chrono::Utc;
use reqwest::Client;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::telemetry::config::ForwardingConfig;
use crate::telemetry::error::TelemetryError;
use crate::telemetry::record::LogRecord;

/// Checks that the indexing sink answers before any records are queued
/// to it. Called once at startup; an unreachable sink is fatal there.
///
/// # Errors
///
/// Returns [`TelemetryError::SinkUnreachable`] if the request fails or
/// the sink answers with an error status.
pub async fn probe_sink(client: &Client, url: &str) -> Result<(), TelemetryError> {
    client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|source| TelemetryError::SinkUnreachable {
            url: url.to_string(),
            source,
        })?;
    Ok(())
}

/// Ships batches of log records to the configured sinks.
///
/// The forwarder runs a spawned task that:
/// 1. Collects records from the queue into a batch
/// 2. Flushes when the batch is full or the flush interval elapses
/// 3. Drains whatever is still queued when stopped
///
/// Every record goes to the indexing sink; error-level records are
/// additionally posted to the monitoring sink.
pub struct SinkForwarder {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl SinkForwarder {
    /// Start the forwarder over the given record queue.
    #[must_use]
    pub fn start(
        config: ForwardingConfig,
        client: Client,
        mut rx: mpsc::Receiver<LogRecord>,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut batch: Vec<LogRecord> = Vec::with_capacity(config.max_batch);
            let mut flush_interval = tokio::time::interval(config.flush_interval);
            // Skip the first immediate tick so nothing flushes at startup.
            flush_interval.tick().await;

            loop {
                tokio::select! {
                    record = rx.recv() => {
                        match record {
                            Some(record) => {
                                batch.push(record);
                                if batch.len() >= config.max_batch {
                                    flush(&client, &config, &mut batch).await;
                                }
                            }
                            None => break, // Channel closed.
                        }
                    }
                    _ = flush_interval.tick() => {
                        flush(&client, &config, &mut batch).await;
                    }
                    _ = &mut shutdown_rx => {
                        break;
                    }
                }
            }

            // Ship what was queued before the stop arrived.
            while let Ok(record) = rx.try_recv() {
                batch.push(record);
            }
            flush(&client, &config, &mut batch).await;
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Stop the forwarder, waiting for the final flush to complete.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn flush(client: &Client, config: &ForwardingConfig, batch: &mut Vec<LogRecord>) {
    if batch.is_empty() {
        return;
    }
    let records = std::mem::take(batch);

    if let Some(url) = &config.index_url {
        if let Err(error) = push_bulk(client, url, &config.index_prefix, &records).await {
            warn!(%error, count = records.len(), "failed to ship records to the indexing sink");
        }
    }

    if let Some(url) = &config.monitoring_url {
        let errors: Vec<&LogRecord> = records.iter().filter(|r| r.level == "error").collect();
        if !errors.is_empty() {
            if let Err(error) = push_monitoring(client, url, &errors).await {
                warn!(%error, count = errors.len(), "failed to ship records to the monitoring sink");
            }
        }
    }
}

/// Posts one `_bulk` request: an action line naming the dated index,
/// then the record source, per record.
async fn push_bulk(
    client: &Client,
    base: &str,
    prefix: &str,
    records: &[LogRecord],
) -> Result<(), reqwest::Error> {
    let index = format!("{prefix}{}", Utc::now().format("%Y.%m.%d"));
    let action = serde_json::json!({ "index": { "_index": index } }).to_string();

    let mut body = String::new();
    for record in records {
        if let Ok(source) = serde_json::to_string(record) {
            body.push_str(&action);
            body.push('\n');
            body.push_str(&source);
            body.push('\n');
        }
    }

    let url = format!("{}/_bulk", base.trim_end_matches('/'));
    client
        .post(&url)
        .header("content-type", "application/x-ndjson")
        .body(body)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

async fn push_monitoring(
    client: &Client,
    url: &str,
    records: &[&LogRecord],
) -> Result<(), reqwest::Error> {
    client
        .post(url)
        .json(records)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
