//! Greeting endpoint, served on `GET /` and `GET /hi`.

use axum::extract::{Query, State};
use concierge_core::{greeting, RequestContext};
use metrics::counter;
use serde::Deserialize;
use tracing::{debug, error};

use super::AppState;
use crate::telemetry::metrics::GUEST_VISITS_TOTAL;

/// Query parameters accepted by the greeting routes.
#[derive(Debug, Deserialize)]
pub struct GreetQuery {
    /// Name to greet. An absent and an empty value are equivalent.
    pub name: Option<String>,
}

/// Handles `GET /` and `GET /hi`.
///
/// A fresh [`RequestContext`] is created at arrival and handed to every
/// downstream call, so all records produced for this request share one
/// trace id. A persist failure is logged under that trace and the request
/// still completes with the greeting.
pub async fn greet_handler(
    State(state): State<AppState>,
    Query(params): Query<GreetQuery>,
) -> String {
    let ctx = RequestContext::new();
    let name = extract_name(&ctx, params.name.as_deref());

    if let Some(store) = &state.store {
        match store.record_visit(&ctx, &name).await {
            Ok(_) => counter!(GUEST_VISITS_TOTAL).increment(1),
            Err(error) => error!(
                trace_id = %ctx.trace_id,
                span_id = %ctx.span_id,
                %error,
                "failed to persist guest visit"
            ),
        }
    }

    greeting::greet(&name)
}

/// Resolves the `name` parameter under a sub-operation context, so the
/// resolution shows up as its own span in exported traces.
fn extract_name(ctx: &RequestContext, raw: Option<&str>) -> String {
    let child = ctx.child();
    let span = tracing::debug_span!(
        "resolve_name",
        trace_id = %child.trace_id,
        span_id = %child.span_id,
    );
    let _entered = span.enter();

    let name = greeting::resolve_name(raw);
    debug!(
        trace_id = %child.trace_id,
        span_id = %child.span_id,
        "received request for {name}"
    );
    name
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::network::ShutdownController;
    use crate::storage::SqliteGuestStore;
    use crate::traits::GuestStore;

    async fn state_with_store() -> AppState {
        let store = SqliteGuestStore::in_memory().await.unwrap();
        store.initialize().await.unwrap();
        AppState {
            store: Some(Arc::new(store)),
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    fn state_without_store() -> AppState {
        AppState {
            store: None,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    #[tokio::test]
    async fn greets_by_name() {
        let body = greet_handler(
            State(state_without_store()),
            Query(GreetQuery {
                name: Some("Ada".to_string()),
            }),
        )
        .await;
        assert_eq!(body, "Hello, Ada\n");
    }

    #[tokio::test]
    async fn greets_guest_when_name_missing() {
        let body = greet_handler(State(state_without_store()), Query(GreetQuery { name: None })).await;
        assert_eq!(body, "Hello, Guest\n");
    }

    #[tokio::test]
    async fn greets_guest_when_name_empty() {
        let body = greet_handler(
            State(state_without_store()),
            Query(GreetQuery {
                name: Some(String::new()),
            }),
        )
        .await;
        assert_eq!(body, "Hello, Guest\n");
    }

    #[tokio::test]
    async fn name_is_substituted_verbatim() {
        let body = greet_handler(
            State(state_without_store()),
            Query(GreetQuery {
                name: Some("Ada <Lovelace>".to_string()),
            }),
        )
        .await;
        assert_eq!(body, "Hello, Ada <Lovelace>\n");
    }

    #[tokio::test]
    async fn repeated_visits_leave_one_live_record() {
        let state = state_with_store().await;
        let ctx = RequestContext::new();

        for _ in 0..2 {
            let body = greet_handler(
                State(state.clone()),
                Query(GreetQuery {
                    name: Some("Ada".to_string()),
                }),
            )
            .await;
            assert_eq!(body, "Hello, Ada\n");
        }

        let store = state.store.as_ref().unwrap();
        assert_eq!(store.live_count(&ctx, "Ada").await.unwrap(), 1);
    }
}
