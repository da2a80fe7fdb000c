//! Authentication middleware: Bearer token extraction and validation.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use warden_core::models::auth::{Identity, TokenKind};

use crate::AppState;
use crate::error::AppError;

/// Key used to store the request [`Identity`] in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

/// The raw bearer token the request was authenticated with.
#[derive(Clone)]
pub struct BearerToken(pub String);

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(request: &Request) -> Result<&str, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;
    if token.is_empty() {
        return Err(AppError::Unauthorized("Invalid authorization scheme".into()));
    }
    Ok(token)
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, validates it as
/// an access token (signature, expiry, kind, blacklist), and injects
/// `AuthenticatedUser` and `BearerToken` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?.to_string();

    let claims = state.tokens.validate(&token, TokenKind::Access).await?;
    let identity = Identity::from_claims(&claims, &state.config.super_admin_roles);

    request.extensions_mut().insert(AuthenticatedUser(identity));
    request.extensions_mut().insert(BearerToken(token));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn with_header(value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&with_header(Some("Bearer abc.def.ghi"))).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn rejects_missing_or_foreign_scheme() {
        assert!(matches!(bearer_token(&with_header(None)), Err(AppError::Unauthorized(_))));
        assert!(matches!(
            bearer_token(&with_header(Some("Basic dXNlcjpwYXNz"))),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            bearer_token(&with_header(Some("Bearer "))),
            Err(AppError::Unauthorized(_))
        ));
    }
}
