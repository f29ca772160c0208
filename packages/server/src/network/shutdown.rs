//! Lifecycle state machine and the shutdown signal behind it.
//!
//! Owns the server lifecycle state machine and the shutdown signal that
//! every long-running task watches. Uses `ArcSwap` for lock-free state
//! reads and an atomic counter with RAII guards for accurate in-flight
//! request tracking.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::info;

/// Server lifecycle state, transitioned by the shutdown controller.
///
/// State machine: Created -> Listening -> Draining -> Stopped. No
/// transition may be skipped and `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Constructed, listener not yet accepting connections.
    Created,
    /// Listener is accepting connections.
    Listening,
    /// Shutdown signalled: no new connections, in-flight ones finishing.
    Draining,
    /// Listener fully stopped; owned resources may now be released.
    Stopped,
}

/// Coordinates shutdown across the server:
/// 1. Middleware wraps every request in an [`InFlightGuard`]
/// 2. `trigger_shutdown()` moves to Draining and signals all watchers
/// 3. The listener task resolves its graceful-shutdown future and drains
/// 4. `mark_stopped()` records that the listener has fully stopped
#[derive(Debug)]
pub struct ShutdownController {
    shutdown_signal: watch::Sender<bool>,
    in_flight: Arc<AtomicU64>,
    state: ArcSwap<ServerState>,
}

impl ShutdownController {
    /// Creates a new controller in the `Created` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            shutdown_signal: tx,
            in_flight: Arc::new(AtomicU64::new(0)),
            state: ArcSwap::from_pointee(ServerState::Created),
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        **self.state.load()
    }

    /// Transitions to `Listening` once the listener task is serving.
    pub fn mark_listening(&self) {
        if **self.state.load() == ServerState::Created {
            self.state.store(Arc::new(ServerState::Listening));
        }
    }

    /// Initiates graceful shutdown: `Listening -> Draining`, then signals
    /// all shutdown watchers.
    ///
    /// Idempotent: calls made before the listener is up, during draining,
    /// or after stop are ignored, so repeated termination signals cannot
    /// restart or corrupt the sequence.
    pub fn trigger_shutdown(&self) {
        if **self.state.load() != ServerState::Listening {
            return;
        }
        self.state.store(Arc::new(ServerState::Draining));
        // Ignore send errors -- receivers may have been dropped.
        let _ = self.shutdown_signal.send(true);
    }

    /// Records that the listener has fully stopped: `Draining -> Stopped`.
    ///
    /// Called whether draining completed normally or was cut off at the
    /// deadline; either way the listener no longer accepts or serves
    /// connections, and resource release may begin.
    pub fn mark_stopped(&self) {
        if **self.state.load() == ServerState::Draining {
            self.state.store(Arc::new(ServerState::Stopped));
        }
    }

    /// Returns `true` once shutdown has been signalled.
    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        *self.shutdown_signal.borrow()
    }

    /// Returns a receiver that is notified when shutdown is triggered.
    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_signal.subscribe()
    }

    /// Returns a future that resolves once shutdown has been signalled.
    ///
    /// Safe to create before or after `trigger_shutdown()`: a watcher
    /// subscribed after the signal fired resolves immediately instead of
    /// waiting for a change that already happened.
    #[must_use]
    pub fn triggered(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown_signal.subscribe();
        async move {
            if !*rx.borrow_and_update() {
                // A closed channel means the controller is gone, which is
                // as final as a shutdown signal.
                let _ = rx.changed().await;
            }
        }
    }

    /// Blocks until a termination signal (interrupt or terminate) arrives
    /// or shutdown is triggered programmatically.
    ///
    /// This is the process's single deliberate indefinite block. Further
    /// signals after the first are not re-observed; shutdown begins once
    /// and runs to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS signal handlers cannot be installed.
    pub async fn await_termination(&self) -> anyhow::Result<()> {
        let mut rx = self.shutdown_signal.subscribe();
        if *rx.borrow_and_update() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut interrupt = signal(SignalKind::interrupt())?;
            let mut terminate = signal(SignalKind::terminate())?;

            tokio::select! {
                _ = interrupt.recv() => info!("interrupt signal received"),
                _ = terminate.recv() => info!("terminate signal received"),
                _ = rx.changed() => {}
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!("interrupt signal received");
                }
                _ = rx.changed() => {}
            }
        }

        Ok(())
    }

    /// Counts one request as in flight until the returned guard drops.
    ///
    /// Middleware takes a guard per request; the count feeds the drain
    /// log line and the drain assertions in tests.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Number of requests currently holding a guard.
    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// One in-flight request, released on drop.
///
/// Drop runs during unwinding too, so the count stays right even when a
/// handler panics.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
