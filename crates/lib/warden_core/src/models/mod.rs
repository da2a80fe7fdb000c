//! Domain models shared by the core components and the HTTP layer.

pub mod auth;
pub mod policy;
