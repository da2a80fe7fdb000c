//! Token refresh, logout and identity handlers.
//!
//! Pair issuance happens in the login flow via
//! [`warden_core::auth::tokens::TokenManager::issue_pair`].

use axum::extract::State;
use axum::{Extension, Json};
use tracing::info;
use warden_core::auth::AuthError;
use warden_core::models::auth::{Identity, TokenKind};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthenticatedUser, BearerToken};
use crate::models::{LogoutRequest, LogoutResponse, RefreshRequest, TokenResponse};

/// `POST /auth/refresh`: exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let pair = state
        .tokens
        .refresh(&body.refresh_token, &state.config.client_secret)
        .await?;
    Ok(Json(pair.into()))
}

/// `POST /auth/logout`: revoke the bearer access token and, optionally, the
/// caller's refresh token. Requires authentication.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(identity)): Extension<AuthenticatedUser>,
    Extension(BearerToken(access_token)): Extension<BearerToken>,
    body: Option<Json<LogoutRequest>>,
) -> AppResult<Json<LogoutResponse>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    if let Some(refresh_token) = body.refresh_token.as_deref() {
        match state.tokens.decode(refresh_token, TokenKind::Refresh) {
            Ok(claims) if claims.uid != identity.uid => {
                return Err(AppError::Forbidden(
                    "Refresh token belongs to another identity".into(),
                ));
            }
            Ok(_) => revoke_once(&state, refresh_token).await?,
            // Already unusable; nothing to revoke.
            Err(AuthError::Expired) => {}
            Err(e) => return Err(e.into()),
        }
    }

    revoke_once(&state, &access_token).await?;
    info!(uid = %identity.uid, "logged out");
    Ok(Json(LogoutResponse { success: true }))
}

/// Revoke, treating an earlier revocation as success.
async fn revoke_once(state: &AppState, token: &str) -> AppResult<()> {
    match state.tokens.revoke(token).await {
        Ok(()) | Err(AuthError::AlreadyRevoked) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// `GET /auth/me`: the identity the request was authenticated as.
pub async fn me_handler(
    Extension(AuthenticatedUser(identity)): Extension<AuthenticatedUser>,
) -> Json<Identity> {
    Json(identity)
}
