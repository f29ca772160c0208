//! Tower middleware applied around the greeter routes.
//!
//! Layer order is outermost first: a request passes the list top to
//! bottom, the response comes back bottom to top. Request ids are minted
//! here so every access log line can be tied to a single request even
//! before a correlation context exists.

use axum::extract::{Request, State};
use axum::http::header::HeaderName;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use metrics::counter;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;
use super::handlers::AppState;
use crate::telemetry::metrics::HTTP_REQUESTS_TOTAL;

/// Concrete type of the stack assembled by [`build_http_layers`].
///
/// `ServiceBuilder` nests one `Stack` per `.layer(...)` call, innermost
/// at the bottom; spelling the nesting out here keeps the builder free
/// of boxing.
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        TimeoutLayer,
        tower::layer::util::Stack<
            TraceLayer<
                tower_http::classify::SharedClassifier<
                    tower_http::classify::ServerErrorsAsFailures,
                >,
            >,
            tower::layer::util::Stack<
                SetRequestIdLayer<MakeRequestUuid>,
                tower::layer::util::Identity,
            >,
        >,
    >,
>;

/// Assembles the per-request layer stack, outermost to innermost:
///
/// 1. set `x-request-id` -- a fresh UUID on every incoming request
/// 2. access tracing -- request/response records with latency and status
/// 3. timeout -- replies `408` once the per-request budget elapses
/// 4. propagate `x-request-id` -- echoes the id back on the response
///
/// A failed response write surfaces through the tracing layer's failure
/// hook as a log record; nothing is retried.
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            x_request_id.clone(),
            MakeRequestUuid,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

/// Holds an in-flight guard for the duration of every request.
///
/// The guard keeps the shutdown controller's in-flight counter accurate,
/// which is what the drain phase reports on when shutdown begins. Dropped
/// on completion, cancellation, and panic alike.
pub async fn track_in_flight(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let _guard = state.shutdown.in_flight_guard();
    counter!(HTTP_REQUESTS_TOTAL).increment(1);
    next.run(request).await
}
