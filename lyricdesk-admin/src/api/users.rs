//! Account administration endpoints
//!
//! Identity changes are authoritative; the profile upsert and the audit log
//! entry that follow them are best-effort and only logged on failure.

use axum::{extract::State, Json};
use lyricdesk_common::db::{AdminLogEntry, Profile};
use lyricdesk_common::Error;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::extract::ApiJson;
use crate::{ApiError, ApiResult, AppState};

/// Body of `POST /api/invite`
#[derive(Debug, Default, Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    /// With a password the account is created directly instead of invited
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `POST /api/users`
#[derive(Debug, Default, Deserialize)]
pub struct UserActionRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// POST /api/invite
pub async fn invite_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<InviteRequest>,
) -> ApiResult<Json<Value>> {
    let email = non_empty(request.email)
        .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?;
    let role = non_empty(request.role);
    let password = request.password.filter(|p| !p.is_empty());
    let reason = non_empty(request.reason);
    let created = password.is_some();

    let user = match &password {
        Some(password) => state.identity.create_user(&email, password).await?,
        None => state.identity.invite_user(&email).await?,
    };

    let mut profile = Profile::new(user.id.clone(), email.clone());
    profile.role = role;
    profile.is_admin = request.is_admin;
    profile.invited = !created;
    if let Err(e) = state.catalog.upsert_profile(&profile).await {
        warn!(user_id = %user.id, error = %e, "Profile upsert failed");
    }

    let action = if created { "create_user" } else { "invite" };
    record_action(
        &state,
        AdminLogEntry {
            user_id: Some(user.id.clone()),
            email: Some(email),
            action: action.to_string(),
            reason,
        },
    )
    .await;

    info!(user_id = %user.id, action, "Account provisioned");
    if created {
        Ok(Json(json!({ "ok": true, "created": true })))
    } else {
        Ok(Json(json!({ "ok": true, "invited": true })))
    }
}

/// POST /api/users
pub async fn user_action(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UserActionRequest>,
) -> ApiResult<Json<Value>> {
    let reason = non_empty(request.reason);

    match request.action.as_deref().map(str::trim) {
        Some("reset_password") => {
            let (user_id, password) = match (non_empty(request.user_id), request.new_password) {
                (Some(user_id), Some(password)) if !password.is_empty() => (user_id, password),
                _ => {
                    return Err(ApiError::BadRequest(
                        "user_id and new_password required".to_string(),
                    ))
                }
            };

            state.identity.set_password(&user_id, &password).await?;
            record_action(&state, log_entry(&user_id, "reset_password", reason)).await;

            info!(user_id = %user_id, "Password reset");
            Ok(Json(json!({ "ok": true })))
        }
        Some("delete_user") => {
            let user_id = non_empty(request.user_id)
                .ok_or_else(|| ApiError::BadRequest("user_id required".to_string()))?;

            state.identity.delete_user(&user_id).await?;
            match state.catalog.delete_profile(&user_id).await {
                Ok(()) | Err(Error::NotFound(_)) => {}
                Err(e) => warn!(user_id = %user_id, error = %e, "Profile delete failed"),
            }
            record_action(&state, log_entry(&user_id, "delete_user", reason)).await;

            info!(user_id = %user_id, "User deleted");
            Ok(Json(json!({ "ok": true })))
        }
        Some("") | None => Err(ApiError::BadRequest("Missing action".to_string())),
        Some(_) => Err(ApiError::BadRequest("Unknown action".to_string())),
    }
}

fn log_entry(user_id: &str, action: &str, reason: Option<String>) -> AdminLogEntry {
    AdminLogEntry {
        user_id: Some(user_id.to_string()),
        email: None,
        action: action.to_string(),
        reason,
    }
}

async fn record_action(state: &AppState, entry: AdminLogEntry) {
    if let Err(e) = state.catalog.log_admin_action(&entry).await {
        warn!(action = %entry.action, error = %e, "Audit log write failed");
    }
}
