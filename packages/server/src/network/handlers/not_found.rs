//! Fallback handler for unmatched routes.

use axum::http::StatusCode;
use concierge_core::RequestContext;
use tracing::error;

/// Responds to any request that matches no registered route.
///
/// Emits an error-level record carrying a fresh correlation context (so
/// probes for unknown paths are attributable in the indexing sink), then
/// returns 404 with an empty body.
pub async fn not_found_handler() -> StatusCode {
    let ctx = RequestContext::new();
    error!(trace_id = %ctx.trace_id, span_id = %ctx.span_id, "unknown route");
    StatusCode::NOT_FOUND
}
