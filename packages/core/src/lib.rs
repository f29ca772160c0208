//! Concierge Core — per-request correlation context and greeting rules.

pub mod context;
pub mod greeting;

pub use context::RequestContext;
pub use greeting::{greet, resolve_name, DEFAULT_NAME};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Compilation is the assertion.
    }
}
