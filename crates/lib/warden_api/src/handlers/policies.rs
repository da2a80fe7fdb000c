//! Policy administration handlers.

use axum::Json;
use axum::extract::{Path, State};
use tracing::info;
use warden_core::models::policy::{PolicyRule, RoleBinding};

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    BindingRequest, ChangeResponse, PolicyRequest, ReloadResponse, RolePoliciesRequest,
    RoleSubjects, SubjectPolicies,
};

/// `GET /policies/{subject}`: direct and inherited roles and permissions.
pub async fn subject_policies_handler(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> AppResult<Json<SubjectPolicies>> {
    let snapshot = state.enforcer.snapshot()?;
    Ok(Json(SubjectPolicies {
        roles: snapshot.roles_of(&subject).into_iter().collect(),
        effective_roles: snapshot.effective_roles(&subject).into_iter().collect(),
        permissions: snapshot.permissions_of(&subject),
        effective_permissions: snapshot.effective_permissions_of(&subject),
        subject,
    }))
}

/// `POST /policies`: add an allow-rule.
pub async fn add_policy_handler(
    State(state): State<AppState>,
    Json(body): Json<PolicyRequest>,
) -> AppResult<Json<ChangeResponse>> {
    let rule = PolicyRule::from(body);
    let changed = state.enforcer.add_policy(rule.clone()).await?;
    if changed {
        info!(subject = %rule.subject, object = %rule.object, action = %rule.action, "policy added");
    }
    Ok(Json(ChangeResponse { changed }))
}

/// `DELETE /policies`: remove an allow-rule.
pub async fn remove_policy_handler(
    State(state): State<AppState>,
    Json(body): Json<PolicyRequest>,
) -> AppResult<Json<ChangeResponse>> {
    let rule = PolicyRule::from(body);
    let changed = state.enforcer.remove_policy(&rule).await?;
    if changed {
        info!(subject = %rule.subject, object = %rule.object, action = %rule.action, "policy removed");
    }
    Ok(Json(ChangeResponse { changed }))
}

/// `PUT /roles/{role}/policies`: replace every grant of a role.
pub async fn set_role_policies_handler(
    State(state): State<AppState>,
    Path(role): Path<String>,
    Json(body): Json<RolePoliciesRequest>,
) -> AppResult<Json<ChangeResponse>> {
    let grants: Vec<(String, String)> = body
        .grants
        .into_iter()
        .map(|g| (g.object, g.action))
        .collect();
    let changed = state.enforcer.set_role_policies(&role, &grants).await?;
    if changed {
        info!(role = %role, grants = grants.len(), "role policies replaced");
    }
    Ok(Json(ChangeResponse { changed }))
}

/// `POST /roles/bindings`: assign a role.
pub async fn assign_role_handler(
    State(state): State<AppState>,
    Json(body): Json<BindingRequest>,
) -> AppResult<Json<ChangeResponse>> {
    let changed = state
        .enforcer
        .assign_role(RoleBinding::new(body.subject, body.role))
        .await?;
    Ok(Json(ChangeResponse { changed }))
}

/// `DELETE /roles/bindings`: unassign a role.
pub async fn unassign_role_handler(
    State(state): State<AppState>,
    Json(body): Json<BindingRequest>,
) -> AppResult<Json<ChangeResponse>> {
    let changed = state
        .enforcer
        .unassign_role(&RoleBinding::new(body.subject, body.role))
        .await?;
    Ok(Json(ChangeResponse { changed }))
}

/// `GET /roles/{role}/subjects`: who holds a role directly.
pub async fn role_subjects_handler(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> AppResult<Json<RoleSubjects>> {
    let subjects = state.enforcer.subjects_of(&role)?.into_iter().collect();
    Ok(Json(RoleSubjects { role, subjects }))
}

/// `DELETE /subjects/{subject}`: drop every rule and binding naming a subject.
pub async fn delete_subject_handler(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> AppResult<Json<ChangeResponse>> {
    let changed = state.enforcer.delete_subject(&subject).await?;
    if changed {
        info!(subject = %subject, "subject removed from policy");
    }
    Ok(Json(ChangeResponse { changed }))
}

/// `POST /policies/reload`: re-read the full rule set from the store.
pub async fn reload_handler(State(state): State<AppState>) -> AppResult<Json<ReloadResponse>> {
    let loaded = state.enforcer.reload().await?;
    Ok(Json(ReloadResponse { loaded }))
}
