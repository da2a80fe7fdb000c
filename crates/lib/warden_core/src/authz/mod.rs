//! Role/policy authorization engine.
//!
//! Allow-only RBAC over `p` rules `(subject, object-pattern, action)` and
//! `g` rules `(subject, role)` with transitive role inheritance. Absence of
//! a matching rule is an implicit deny.

pub mod enforcer;
pub mod matcher;
pub mod model;
pub mod store;

use thiserror::Error;

pub use enforcer::Enforcer;
pub use model::PolicySet;
pub use store::{MemoryPolicyStore, PgPolicyStore, PolicyDelta, PolicyStore};

/// Authorization engine errors.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("Policy engine not loaded")]
    NotReady,

    #[error("Policy store unavailable: {0}")]
    BackingStore(String),

    #[error("Policy change could not be saved: {0}")]
    Persistence(String),

    #[error("Invalid policy: {0}")]
    Invalid(String),
}
