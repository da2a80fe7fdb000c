//! # warden_core
//!
//! Trust-and-access primitives for Warden: signed session credentials and
//! their revocation list, the role/policy authorization engine, and the
//! per-client admission controller.

pub mod auth;
pub mod authz;
pub mod migrate;
pub mod models;
pub mod ratelimit;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
