//! Subscriber layer that feeds log events into the forwarding queue.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::telemetry::record::LogRecord;

/// Targets whose events are never shipped. Records emitted while
/// shipping a batch must not feed back into the queue.
const SUPPRESSED_TARGETS: &[&str] = &[
    "concierge_server::telemetry",
    "hyper",
    "h2",
    "reqwest",
    "rustls",
    "tonic",
];

/// Captures events at or above a severity floor and hands them to the
/// sink forwarder over a bounded queue.
///
/// The layer never blocks the caller: when the queue is full the record
/// is dropped.
pub struct SinkLayer {
    tx: mpsc::Sender<LogRecord>,
    min_level: Level,
}

impl SinkLayer {
    #[must_use]
    pub fn new(tx: mpsc::Sender<LogRecord>, min_level: Level) -> Self {
        Self { tx, min_level }
    }
}

impl<S: Subscriber> Layer<S> for SinkLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // Severities order from ERROR upward, so "at or above the floor"
        // is a less-or-equal comparison.
        if metadata.level() > &self.min_level {
            return;
        }
        let target = metadata.target();
        if SUPPRESSED_TARGETS
            .iter()
            .any(|prefix| target.starts_with(prefix))
        {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let record = LogRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: level_str(metadata.level()).to_string(),
            target: target.to_string(),
            message: visitor.message,
            fields: visitor.fields,
        };

        let _ = self.tx.try_send(record);
    }
}

fn level_str(level: &Level) -> &'static str {
    if *level == Level::ERROR {
        "error"
    } else if *level == Level::WARN {
        "warn"
    } else if *level == Level::INFO {
        "info"
    } else if *level == Level::DEBUG {
        "debug"
    } else {
        "trace"
    }
}

/// Collects event fields into the record, separating out `message`.
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: serde_json::Map<String, Value>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::Bool(value));
    }
}
