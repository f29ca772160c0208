//! Wire shape of a shipped log record.

use serde::{Deserialize, Serialize};

/// A single log record as shipped to the sinks.
///
/// The field names follow the indexing sink's conventions: `@timestamp`
/// carries an RFC 3339 instant and structured event fields are flattened
/// to top-level keys so they are searchable without nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Event time, RFC 3339 with millisecond precision.
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    /// Lowercase severity (`"error"`, `"warn"`, ...).
    pub level: String,
    /// Module path that emitted the record.
    pub target: String,
    /// Rendered message text.
    pub message: String,
    /// Remaining structured fields of the event.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_sink_field_names() {
        let mut fields = serde_json::Map::new();
        fields.insert(
            "trace_id".to_string(),
            serde_json::Value::String("abc".to_string()),
        );

        let record = LogRecord {
            timestamp: "2026-08-26T12:00:00.000Z".to_string(),
            level: "debug".to_string(),
            target: "concierge_server::network".to_string(),
            message: "received request for Ada".to_string(),
            fields,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["@timestamp"], "2026-08-26T12:00:00.000Z");
        assert_eq!(value["level"], "debug");
        assert_eq!(value["message"], "received request for Ada");
        assert_eq!(value["trace_id"], "abc");
    }
}
