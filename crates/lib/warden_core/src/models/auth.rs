//! Authentication domain models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which role a signed token plays. Fixed at issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived credential presented on every request.
    Access,
    /// Long-lived credential accepted only by the refresh flow.
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT claims embedded in both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Identity id.
    pub uid: String,
    /// Display name.
    pub username: String,
    /// Role id (the role key policies are written against).
    pub role_id: String,
    /// Per-issuance client key.
    pub client_key: String,
    /// Client-scoped secondary authentication tag over `client_key`.
    pub tag: String,
    /// Whether the pair was issued with the extended lifetime.
    pub remember: bool,
    pub kind: TokenKind,
    /// Unique token id.
    pub jti: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Not before (unix timestamp).
    pub nbf: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    pub iss: String,
    /// Subject: identity id (standard JWT `sub` claim).
    pub sub: String,
}

/// A freshly issued access/refresh pair. The caller owns it; nothing is retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub access_expires_in: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: i64,
}

/// Identity attached to a request after its bearer token validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub username: String,
    pub role_id: String,
    pub client_key: String,
    /// Super-administrators skip policy evaluation entirely.
    pub super_admin: bool,
}

impl Identity {
    /// Build the request identity from validated claims.
    ///
    /// `super_admin_roles` lists the role ids that carry the
    /// super-administrator bypass.
    pub fn from_claims(claims: &TokenClaims, super_admin_roles: &[String]) -> Self {
        Self {
            uid: claims.uid.clone(),
            username: claims.username.clone(),
            role_id: claims.role_id.clone(),
            client_key: claims.client_key.clone(),
            super_admin: super_admin_roles.iter().any(|r| r == &claims.role_id),
        }
    }
}
