//! Shared fixtures: in-memory stores and a ready `AppState`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use tower::ServiceExt;
use warden_api::AppState;
use warden_api::config::ApiConfig;
use warden_core::auth::blacklist::MemoryRevocationStore;
use warden_core::auth::tokens::TokenSubject;
use warden_core::authz::{Enforcer, MemoryPolicyStore};
use warden_core::models::auth::TokenPair;
use warden_core::models::policy::{PolicyRow, PolicyRule, RoleBinding};

pub const CLIENT_SECRET: &str = "test-client-secret";

pub fn test_config() -> ApiConfig {
    ApiConfig {
        jwt_secret: "test-secret".into(),
        client_secret: CLIENT_SECRET.into(),
        ..Default::default()
    }
}

/// Policy fixture: `editor` inherits `viewer`; viewers may GET policy listings.
pub fn seed_rows() -> Vec<PolicyRow> {
    vec![
        PolicyRow::from(&PolicyRule::new("viewer", "/policies/*", "GET")),
        PolicyRow::from(&PolicyRule::new("viewer", "/roles/*/subjects", "GET")),
        PolicyRow::from(&RoleBinding::new("editor", "viewer")),
    ]
}

pub async fn state_with(config: ApiConfig) -> AppState {
    let enforcer = Enforcer::load(Arc::new(MemoryPolicyStore::with_rows(seed_rows())))
        .await
        .expect("load policy");
    AppState::new(
        config,
        Arc::new(MemoryRevocationStore::new()),
        Arc::new(enforcer),
    )
    .expect("build state")
}

pub async fn test_state() -> AppState {
    state_with(test_config()).await
}

pub fn login(state: &AppState, uid: &str, role_id: &str) -> TokenPair {
    let subject = TokenSubject {
        uid: uid.into(),
        username: format!("user-{uid}"),
        role_id: role_id.into(),
        client_key: format!("ck-{uid}"),
    };
    state
        .tokens
        .issue_pair(&subject, CLIENT_SECRET, false)
        .expect("issue pair")
}

pub fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(state: &AppState, req: Request<Body>) -> Response<Body> {
    warden_api::router(state.clone())
        .oneshot(req)
        .await
        .expect("request")
}

pub async fn json_body(resp: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("parse JSON")
}

pub async fn expect_status(state: &AppState, req: Request<Body>, status: StatusCode) -> serde_json::Value {
    let resp = send(state, req).await;
    assert_eq!(resp.status(), status);
    json_body(resp).await
}
