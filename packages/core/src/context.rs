//! Per-request correlation context.
//!
//! A [`RequestContext`] is created when a request arrives and passed by
//! value or reference through every function on the request path, so log
//! records and storage operations can be attributed to the request that
//! caused them. It is never stored in thread-local or global state, never
//! persisted, and never shared across requests.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of a trace identifier in lowercase hex characters.
pub const TRACE_ID_LEN: usize = 32;

/// Length of a span identifier in lowercase hex characters.
pub const SPAN_ID_LEN: usize = 16;

/// Correlation identifier pair for a single in-flight request.
///
/// The trace id is shared by every operation performed on behalf of the
/// request; each sub-operation gets its own span id via [`child`].
///
/// [`child`]: RequestContext::child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Identifies the request across all operations it triggers.
    pub trace_id: String,
    /// Identifies one operation within the trace.
    pub span_id: String,
}

impl RequestContext {
    /// Creates a fresh context with new trace and span identifiers.
    ///
    /// Called exactly once per inbound request, at the point of arrival.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().simple().to_string(),
            span_id: new_span_id(),
        }
    }

    /// Derives a sub-operation context: same trace id, fresh span id.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: new_span_id(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

fn new_span_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SPAN_ID_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_lower_hex(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    }

    #[test]
    fn new_produces_well_formed_identifiers() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.trace_id.len(), TRACE_ID_LEN);
        assert_eq!(ctx.span_id.len(), SPAN_ID_LEN);
        assert!(is_lower_hex(&ctx.trace_id));
        assert!(is_lower_hex(&ctx.span_id));
    }

    #[test]
    fn new_contexts_are_distinct() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        assert_ne!(a.trace_id, b.trace_id);
        assert_ne!(a.span_id, b.span_id);
    }

    #[test]
    fn child_keeps_trace_and_rotates_span() {
        let parent = RequestContext::new();
        let child = parent.child();
        assert_eq!(child.trace_id, parent.trace_id);
        assert_ne!(child.span_id, parent.span_id);
        assert_eq!(child.span_id.len(), SPAN_ID_LEN);
    }

    #[test]
    fn serializes_with_plain_field_names() {
        let ctx = RequestContext {
            trace_id: "a".repeat(TRACE_ID_LEN),
            span_id: "b".repeat(SPAN_ID_LEN),
        };
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["trace_id"], "a".repeat(TRACE_ID_LEN));
        assert_eq!(json["span_id"], "b".repeat(SPAN_ID_LEN));
    }
}
