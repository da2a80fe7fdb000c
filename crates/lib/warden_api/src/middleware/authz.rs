//! Authorization middleware: policy check on (role, path, method).
//!
//! Super-administrators are an explicit exception: a request whose identity
//! carries `super_admin` is authorized without consulting the engine, and no
//! policy data can revoke that.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::auth::AuthenticatedUser;
use crate::AppState;
use crate::error::AppError;

/// Axum middleware: must run inside [`super::auth::require_auth`].
pub async fn require_permission(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| &user.0)
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

    if identity.super_admin {
        debug!(uid = %identity.uid, "super-admin bypass");
        return Ok(next.run(request).await);
    }
    if !state.config.authz_enabled {
        return Ok(next.run(request).await);
    }

    let path = request.uri().path();
    let method = request.method().as_str();
    if !state.enforcer.enforce(&identity.role_id, path, method)? {
        debug!(uid = %identity.uid, role = %identity.role_id, path, method, "permission denied");
        return Err(AppError::Forbidden("Insufficient permissions".into()));
    }

    Ok(next.run(request).await)
}
