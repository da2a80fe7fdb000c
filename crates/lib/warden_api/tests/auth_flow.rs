//! Bearer authentication, refresh and logout through the router.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::*;

#[tokio::test]
async fn me_without_bearer_is_unauthorized() {
    let state = test_state().await;
    let body = expect_status(&state, request("GET", "/auth/me", None, None), StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn me_with_garbage_bearer_is_unauthorized() {
    let state = test_state().await;
    let req = request("GET", "/auth/me", Some("not-a-jwt"), None);
    let body = expect_status(&state, req, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn me_returns_identity_from_access_token() {
    let state = test_state().await;
    let pair = login(&state, "u1", "editor");
    let req = request("GET", "/auth/me", Some(&pair.access_token), None);
    let body = expect_status(&state, req, StatusCode::OK).await;
    assert_eq!(body["uid"], "u1");
    assert_eq!(body["roleId"], "editor");
    assert_eq!(body["superAdmin"], false);
}

#[tokio::test]
async fn refresh_token_is_not_accepted_as_bearer() {
    let state = test_state().await;
    let pair = login(&state, "u1", "editor");
    let req = request("GET", "/auth/me", Some(&pair.refresh_token), None);
    let body = expect_status(&state, req, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["message"], "Invalid token type");
}

#[tokio::test]
async fn refresh_issues_new_pair_once() {
    let state = test_state().await;
    let pair = login(&state, "u1", "editor");
    let payload = json!({ "refreshToken": pair.refresh_token });

    let req = request("POST", "/auth/refresh", None, Some(payload.clone()));
    let body = expect_status(&state, req, StatusCode::OK).await;
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 3600);
    let fresh = body["accessToken"].as_str().expect("access token").to_string();

    let req = request("GET", "/auth/me", Some(&fresh), None);
    expect_status(&state, req, StatusCode::OK).await;

    // The old refresh token was rotated out.
    let req = request("POST", "/auth/refresh", None, Some(payload));
    expect_status(&state, req, StatusCode::UNAUTHORIZED).await;
}

#[tokio::test]
async fn access_token_cannot_refresh() {
    let state = test_state().await;
    let pair = login(&state, "u1", "editor");
    let payload = json!({ "refreshToken": pair.access_token });
    let req = request("POST", "/auth/refresh", None, Some(payload));
    expect_status(&state, req, StatusCode::UNAUTHORIZED).await;
}

#[tokio::test]
async fn logout_revokes_access_and_refresh_tokens() {
    let state = test_state().await;
    let pair = login(&state, "u1", "editor");

    let payload = json!({ "refreshToken": pair.refresh_token });
    let req = request("POST", "/auth/logout", Some(&pair.access_token), Some(payload));
    let body = expect_status(&state, req, StatusCode::OK).await;
    assert_eq!(body["success"], true);

    let req = request("GET", "/auth/me", Some(&pair.access_token), None);
    let body = expect_status(&state, req, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["message"], "Token revoked");

    let payload = json!({ "refreshToken": pair.refresh_token });
    let req = request("POST", "/auth/refresh", None, Some(payload));
    expect_status(&state, req, StatusCode::UNAUTHORIZED).await;
}

#[tokio::test]
async fn logout_without_body_revokes_bearer_only() {
    let state = test_state().await;
    let pair = login(&state, "u1", "editor");

    let req = request("POST", "/auth/logout", Some(&pair.access_token), None);
    expect_status(&state, req, StatusCode::OK).await;

    let payload = json!({ "refreshToken": pair.refresh_token });
    let req = request("POST", "/auth/refresh", None, Some(payload));
    expect_status(&state, req, StatusCode::OK).await;
}

#[tokio::test]
async fn logout_refuses_foreign_refresh_token() {
    let state = test_state().await;
    let mine = login(&state, "u1", "editor");
    let theirs = login(&state, "u2", "editor");

    let payload = json!({ "refreshToken": theirs.refresh_token });
    let req = request("POST", "/auth/logout", Some(&mine.access_token), Some(payload));
    expect_status(&state, req, StatusCode::FORBIDDEN).await;

    // Nothing was revoked.
    let req = request("GET", "/auth/me", Some(&mine.access_token), None);
    expect_status(&state, req, StatusCode::OK).await;
}
