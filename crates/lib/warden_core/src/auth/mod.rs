//! Token lifecycle: signing, validation, refresh and revocation.
//!
//! [`jwt::JwtCodec`] turns claim sets into bearer strings and back,
//! [`tokens::TokenManager`] layers token-kind discipline, the client-scoped
//! refresh tag and the revocation list on top of it.

pub mod blacklist;
pub mod client_tag;
pub mod jwt;
pub mod tokens;

use thiserror::Error;

use crate::models::auth::TokenKind;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Token expired")]
    Expired,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Wrong token kind: expected {expected}, got {actual}")]
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },

    #[error("Client authentication tag mismatch")]
    Tamper,

    #[error("Token revoked")]
    Revoked,

    #[error("Token already revoked")]
    AlreadyRevoked,

    #[error("Revocation store unavailable: {0}")]
    BackingStore(String),

    #[error("Invalid token settings: {0}")]
    Config(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::BackingStore(e.to_string())
    }
}
