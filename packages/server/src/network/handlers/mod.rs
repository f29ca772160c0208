//! HTTP handler definitions for the greeter service.
//!
//! Defines `AppState` (the shared state carried through axum extractors)
//! and re-exports the handler functions used when building the router.

pub mod greet;
pub mod not_found;

pub use greet::greet_handler;
pub use not_found::not_found_handler;

use std::sync::Arc;

use crate::traits::GuestStore;

use super::ShutdownController;

/// What every handler gets through axum's `State` extractor.
///
/// Holds `Arc` references to shared resources so cloning is cheap. The
/// store is optional because some deployments run the greeter without
/// persistence.
#[derive(Clone)]
pub struct AppState {
    /// Guest persistence backend, when the deployment enables one.
    pub store: Option<Arc<dyn GuestStore>>,
    /// Graceful shutdown controller with lifecycle state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
}
