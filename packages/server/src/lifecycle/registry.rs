use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// ManagedService trait
// ---------------------------------------------------------------------------

/// Lifecycle-managed resource trait. Long-lived handles such as the
/// telemetry pipeline and the guest store implement this.
///
/// Services are registered with a [`ServiceRegistry`], initialized in
/// registration order, and released in reverse registration order.
#[async_trait]
pub trait ManagedService: Send + Sync {
    /// Returns the unique name of this service (e.g. `"storage"`).
    fn name(&self) -> &'static str;

    /// Initialize the service. Called once before the server starts
    /// listening; a failure here aborts startup.
    async fn init(&self) -> anyhow::Result<()>;

    /// Release the service. Called once after the listener has stopped.
    async fn shutdown(&self) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// ServiceRegistry
// ---------------------------------------------------------------------------

/// Ordered registry for lifecycle-managed services.
///
/// Registration order determines init sequencing; release walks the same
/// list backwards so the most recently acquired resource is released
/// first.
pub struct ServiceRegistry {
    services: Mutex<Vec<Arc<dyn ManagedService>>>,
}

impl ServiceRegistry {
    /// Empty registry; services arrive via [`register`](Self::register).
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: Mutex::new(Vec::new()),
        }
    }

    /// Register a service. Registration order determines init and
    /// release sequencing.
    pub fn register<T: ManagedService + 'static>(&self, service: T) {
        self.services.lock().push(Arc::new(service));
    }

    /// Walks the services front to back, initializing each.
    ///
    /// # Errors
    ///
    /// Returns the first `init()` failure; services after the failing
    /// one are not initialized.
    pub async fn init_all(&self) -> anyhow::Result<()> {
        let services = self.services.lock().clone();
        for service in &services {
            service.init().await?;
            info!(service = service.name(), "service initialized");
        }
        Ok(())
    }

    /// Release all registered services in reverse registration order.
    ///
    /// A failure is logged and the walk continues, so every service
    /// receives its release call.
    pub async fn shutdown_all(&self) {
        let services = self.services.lock().clone();
        for service in services.iter().rev() {
            if let Err(error) = service.shutdown().await {
                warn!(service = service.name(), %error, "service release failed");
            } else {
                info!(service = service.name(), "service released");
            }
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
