//! # warden_api
//!
//! HTTP surface for Warden: admission control, bearer authentication and
//! policy authorization middleware, plus token and policy-administration
//! handlers.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use warden_core::auth::blacklist::RevocationStore;
use warden_core::auth::tokens::TokenManager;
use warden_core::authz::Enforcer;
use warden_core::ratelimit::RateLimiter;

use crate::config::ApiConfig;
use crate::error::StateError;
use crate::handlers::{auth, policies};

/// Shared application state passed to all handlers.
///
/// The three core components are process-wide and passed in explicitly.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    pub tokens: Arc<TokenManager>,
    pub enforcer: Arc<Enforcer>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Build the token manager and rate limiter from `config`.
    ///
    /// `enforcer` is expected to be loaded already.
    pub fn new(
        config: ApiConfig,
        revocations: Arc<dyn RevocationStore>,
        enforcer: Arc<Enforcer>,
    ) -> Result<Self, StateError> {
        let tokens = TokenManager::new(
            config.jwt_secret.as_bytes(),
            config.token.clone(),
            revocations,
        )?;
        let limiter = RateLimiter::new(config.rate_limit.clone())?;
        Ok(Self {
            config,
            tokens: Arc::new(tokens),
            enforcer,
            limiter: Arc::new(limiter),
        })
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new().route("/auth/refresh", post(auth::refresh_handler));

    // Authenticated routes
    let authenticated = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    // Policy administration (auth + permission)
    let admin = Router::new()
        .route(
            "/policies",
            post(policies::add_policy_handler).delete(policies::remove_policy_handler),
        )
        .route("/policies/reload", post(policies::reload_handler))
        .route("/policies/{subject}", get(policies::subject_policies_handler))
        .route(
            "/roles/bindings",
            post(policies::assign_role_handler).delete(policies::unassign_role_handler),
        )
        .route("/roles/{role}/policies", put(policies::set_role_policies_handler))
        .route("/roles/{role}/subjects", get(policies::role_subjects_handler))
        .route("/subjects/{subject}", delete(policies::delete_subject_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authz::require_permission,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    // Admission control wraps everything, including unauthenticated routes.
    Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(admin)
        .layer(cors)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ))
        .with_state(state)
}
