//! Request and response bodies.

use serde::{Deserialize, Serialize};
use warden_core::models::auth::TokenPair;
use warden_core::models::policy::PolicyRule;

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    /// Refresh token to revoke alongside the bearer access token.
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Token pair as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
    pub token_type: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.access_expires_in,
            refresh_expires_in: pair.refresh_expires_in,
            token_type: "Bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyRequest {
    pub subject: String,
    pub object: String,
    pub action: String,
}

impl From<PolicyRequest> for PolicyRule {
    fn from(req: PolicyRequest) -> Self {
        PolicyRule::new(req.subject, req.object, req.action)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BindingRequest {
    pub subject: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Grant {
    pub object: String,
    pub action: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RolePoliciesRequest {
    pub grants: Vec<Grant>,
}

/// Whether a mutation changed the policy set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeResponse {
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub loaded: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPolicies {
    pub subject: String,
    pub roles: Vec<String>,
    pub effective_roles: Vec<String>,
    pub permissions: Vec<PolicyRule>,
    pub effective_permissions: Vec<PolicyRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSubjects {
    pub role: String,
    pub subjects: Vec<String>,
}
