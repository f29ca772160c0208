//! Startup and shutdown orchestration.
//!
//! [`ServiceRegistry`] tracks long-lived resources in acquisition order;
//! [`Coordinator`] drives the serve-then-drain sequence around the
//! network module and releases those resources on the way out.

pub mod coordinator;
pub mod registry;

pub use coordinator::Coordinator;
pub use registry::{ManagedService, ServiceRegistry};
