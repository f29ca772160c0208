//! Guest persistence: record types and the sqlite-backed store.

pub mod guest;
pub mod sqlite;

pub use guest::Guest;
pub use sqlite::SqliteGuestStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::lifecycle::ManagedService;
use crate::traits::GuestStore;

/// Lifecycle adapter that owns the store handle for startup and release.
///
/// Registered after telemetry, so reverse-order release closes the store
/// first and the close is still logged and shipped.
pub struct StorageService {
    store: Arc<dyn GuestStore>,
}

impl StorageService {
    #[must_use]
    pub fn new(store: Arc<dyn GuestStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ManagedService for StorageService {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn init(&self) -> anyhow::Result<()> {
        self.store.initialize().await
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        self.store.close().await
    }
}
