//! Listener lifecycle: construct, bind, serve.
//!
//! Construction allocates shared state only; `start()` is the single
//! place a socket is opened, so a bad address fails the process before
//! any request is accepted instead of surfacing from a background task.
//! `serve()` then runs the accept loop until graceful shutdown.

use std::future::Future;
use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::traits::GuestStore;

use super::config::NetworkConfig;
use super::handlers::{greet_handler, not_found_handler, AppState};
use super::middleware::{build_http_layers, track_in_flight};
use super::shutdown::ShutdownController;

/// The HTTP listener and everything it serves.
///
/// Split into three phases so binding is observable on its own:
/// 1. `new()` -- shared state only, no socket
/// 2. `start()` -- bind, report the real port
/// 3. `serve()` -- accept until the shutdown future fires, then drain
///
/// The shutdown controller lives behind an `Arc` so the coordinator
/// keeps a handle to it after `serve()` consumes the module.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    store: Option<Arc<dyn GuestStore>>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Builds the module around its config and an optional guest store.
    /// No port is bound here.
    #[must_use]
    pub fn new(config: NetworkConfig, store: Option<Arc<dyn GuestStore>>) -> Self {
        Self {
            config,
            listener: None,
            store,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Handle on the controller that triggers and observes shutdown.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Router over the greeter surface:
    /// - `GET /` and `GET /hi` -- greeting, `name` query optional
    /// - everything else -- empty 404
    #[must_use]
    pub fn build_router(&self) -> Router {
        let state = AppState {
            store: self.store.clone(),
            shutdown: Arc::clone(&self.shutdown),
        };
        build_router(&self.config, state)
    }

    /// Opens the listener socket and reports the port actually bound,
    /// which matters when the config asked for port 0.
    ///
    /// # Errors
    ///
    /// Returns an error when the address is unavailable. There is no
    /// retry; a failed bind is fatal at startup.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("listener bound on {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Accepts connections until `shutdown` resolves, then drains.
    ///
    /// Consumes `self` because the listener moves into the server. Meant
    /// to run on a spawned task; when it returns, every connection that
    /// was in flight at the shutdown signal has completed.
    ///
    /// # Errors
    ///
    /// Returns an error on a fatal accept-loop I/O failure.
    ///
    /// # Panics
    ///
    /// Panics when called before `start()` has bound the listener.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .expect("start() must be called before serve()");

        let state = AppState {
            store: self.store,
            shutdown: Arc::clone(&self.shutdown),
        };
        let router = build_router(&self.config, state);

        info!("serving requests");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("listener drained and stopped");
        Ok(())
    }
}

fn build_router(config: &NetworkConfig, state: AppState) -> Router {
    Router::new()
        .route("/", get(greet_handler))
        .route("/hi", get(greet_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_in_flight,
        ))
        .layer(build_http_layers(config))
        .with_state(state)
}
