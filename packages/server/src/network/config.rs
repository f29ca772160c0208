//! Network configuration for the greeter service.

use std::time::Duration;

/// Listener and request-handling configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Interface the listener binds to.
    pub host: String,
    /// Listener port; 0 asks the OS for an ephemeral one.
    pub port: u16,
    /// Per-request budget; requests over it answer `408`.
    pub request_timeout: Duration,
    /// Maximum time to wait for in-flight connections to finish once
    /// shutdown has been signalled.
    pub shutdown_grace: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl NetworkConfig {
    /// Configuration for tests: loopback host and an OS-assigned port.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Self::default()
        }
    }
}
