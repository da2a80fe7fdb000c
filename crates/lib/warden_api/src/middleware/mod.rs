//! Request middleware, outermost first: admission control, bearer
//! authentication, policy authorization.

pub mod auth;
pub mod authz;
pub mod rate_limit;
