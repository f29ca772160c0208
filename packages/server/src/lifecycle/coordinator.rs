use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::lifecycle::ServiceRegistry;
use crate::network::{NetworkModule, ShutdownController};

type ServeOutcome = Result<anyhow::Result<()>, JoinError>;

/// Drives the serve-then-drain lifecycle around the network module.
///
/// [`run`](Coordinator::run) owns the whole sequence: spawn the
/// listener, publish the `Listening` state, block until a stop request
/// arrives, bound the drain, and release registered services in reverse
/// acquisition order. An orderly stop returns `Ok(())` so the process
/// can exit with status 0.
pub struct Coordinator {
    module: NetworkModule,
    shutdown: Arc<ShutdownController>,
    services: ServiceRegistry,
    grace: Duration,
}

impl Coordinator {
    /// Creates a coordinator around a started network module.
    #[must_use]
    pub fn new(module: NetworkModule, services: ServiceRegistry, grace: Duration) -> Self {
        let shutdown = module.shutdown_controller();
        Self {
            module,
            shutdown,
            services,
            grace,
        }
    }

    /// Handle on the shutdown controller, for programmatic stops.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Serves until a stop is requested, then drains and releases.
    ///
    /// Registered services are released on every exit path, including
    /// listener failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener stops before any stop request,
    /// or if waiting for termination signals fails. An orderly stop
    /// returns `Ok(())` even when the drain deadline expires.
    ///
    /// # Panics
    ///
    /// Panics if [`NetworkModule::start`] was not called first.
    pub async fn run(self) -> anyhow::Result<()> {
        let Self {
            module,
            shutdown,
            services,
            grace,
        } = self;

        let graceful = shutdown.triggered();
        let mut serve_task = tokio::spawn(module.serve(graceful));
        shutdown.mark_listening();

        let mut early_outcome = None;
        tokio::select! {
            outcome = &mut serve_task => {
                if !shutdown.shutdown_requested() {
                    error!("listener stopped without a shutdown request");
                    services.shutdown_all().await;
                    return Err(unexpected_stop(outcome));
                }
                early_outcome = Some(outcome);
            }
            waited = shutdown.await_termination() => {
                if let Err(error) = waited {
                    error!(%error, "termination wait failed");
                    services.shutdown_all().await;
                    return Err(error);
                }
            }
        }

        shutdown.trigger_shutdown();

        let outcome = match early_outcome {
            Some(outcome) => outcome,
            None => {
                info!(
                    in_flight = shutdown.in_flight_count(),
                    "draining in-flight requests"
                );
                drain(&mut serve_task, grace).await
            }
        };
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!(%error, "listener exited with error"),
            Err(join) if join.is_cancelled() => {}
            Err(join) => warn!(error = %join, "listener task failed"),
        }

        shutdown.mark_stopped();
        services.shutdown_all().await;
        info!("shutdown complete");
        Ok(())
    }
}

/// Waits up to `grace` for the listener task, then aborts it.
async fn drain(serve_task: &mut JoinHandle<anyhow::Result<()>>, grace: Duration) -> ServeOutcome {
    match timeout(grace, &mut *serve_task).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(grace_secs = grace.as_secs(), "drain deadline exceeded, aborting listener");
            serve_task.abort();
            serve_task.await
        }
    }
}

fn unexpected_stop(outcome: ServeOutcome) -> anyhow::Error {
    match outcome {
        Ok(Ok(())) => anyhow::anyhow!("listener stopped without a shutdown request"),
        Ok(Err(error)) => error,
        Err(join) => anyhow::Error::new(join),
    }
}
