//! Admission control middleware. Runs before authentication, so
//! unauthenticated traffic is counted too.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// Fallback identity when the peer address is unknown.
const UNKNOWN_CLIENT: &str = "unknown";

/// Network identity the request is admitted under.
pub fn client_identity(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for
        && let Some(hop) = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
    {
        return hop.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Axum middleware: consumes one token from the client's bucket or rejects
/// with `429` without running anything further.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_identity(&request, state.config.trust_forwarded_for);
    if !state.limiter.allow(&client) {
        debug!(client = %client, path = %request.uri().path(), "request rate limited");
        return Err(AppError::TooManyRequests);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request(xff: Option<&str>, peer: Option<SocketAddr>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(xff) = xff {
            builder = builder.header("x-forwarded-for", xff);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        if let Some(peer) = peer {
            req.extensions_mut().insert(ConnectInfo(peer));
        }
        req
    }

    #[test]
    fn peer_address_is_used_by_default() {
        let peer: SocketAddr = "192.0.2.4:5555".parse().unwrap();
        let req = request(Some("203.0.113.9"), Some(peer));
        assert_eq!(client_identity(&req, false), "192.0.2.4");
    }

    #[test]
    fn forwarded_for_first_hop_when_trusted() {
        let peer: SocketAddr = "10.0.0.1:80".parse().unwrap();
        let req = request(Some("203.0.113.9, 10.0.0.1"), Some(peer));
        assert_eq!(client_identity(&req, true), "203.0.113.9");
    }

    #[test]
    fn unknown_without_any_address() {
        assert_eq!(client_identity(&request(None, None), true), "unknown");
        assert_eq!(client_identity(&request(Some(" "), None), true), "unknown");
    }
}
