//! Command: print version information.
use crate::logging::{Log, Logger};

/// Version string: the build's `FRECKLE_VERSION`, else the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("FRECKLE_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Log the freckle version.
pub fn run(log: &Logger) {
    log.info(&format!("freckle {}", version()));
}
