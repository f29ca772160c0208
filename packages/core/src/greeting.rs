//! Name resolution and greeting formatting.
//!
//! The response body contract is byte-exact: `Hello, <name>\n`, with the
//! name substituted verbatim (no escaping or normalization) and the default
//! applied when the parameter is missing or empty.

/// Name used when the request carries no usable `name` parameter.
pub const DEFAULT_NAME: &str = "Guest";

/// Resolves the raw query-parameter value into the name to greet.
///
/// `None` (parameter absent) and `Some("")` (parameter present but empty)
/// both resolve to [`DEFAULT_NAME`]. Any other value is taken verbatim.
#[must_use]
pub fn resolve_name(raw: Option<&str>) -> String {
    match raw {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_NAME.to_string(),
    }
}

/// Formats the greeting body for a resolved name.
#[must_use]
pub fn greet(name: &str) -> String {
    format!("Hello, {name}\n")
}
