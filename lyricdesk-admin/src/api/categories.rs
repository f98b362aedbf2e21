//! Category endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use lyricdesk_common::db::Category;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::extract::ApiJson;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: String,
}

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.catalog.list_categories().await?))
}

/// POST /api/categories
///
/// Names must be unique ignoring case, since CSV imports look categories
/// up by name.
pub async fn create_category(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    ensure_unique(&state, &request.name, None).await?;
    let category = state.catalog.create_category(&request.name).await?;

    info!(category_id = %category.id, name = %category.name, "Created category");
    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /api/categories/:id
pub async fn rename_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<CategoryRequest>,
) -> ApiResult<Json<Value>> {
    ensure_unique(&state, &request.name, Some(&id)).await?;
    state.catalog.rename_category(&id, &request.name).await?;

    info!(category_id = %id, "Renamed category");
    Ok(Json(json!({ "ok": true })))
}

/// DELETE /api/categories/:id
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.catalog.delete_category(&id).await?;

    info!(category_id = %id, "Deleted category");
    Ok(Json(json!({ "ok": true })))
}

async fn ensure_unique(state: &AppState, name: &str, except_id: Option<&str>) -> ApiResult<()> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return Err(ApiError::BadRequest("Category name is required".to_string()));
    }

    let taken = state
        .catalog
        .list_categories()
        .await?
        .into_iter()
        .any(|c| c.name.trim().to_lowercase() == wanted && Some(c.id.as_str()) != except_id);
    if taken {
        return Err(ApiError::Conflict(format!("Category already exists: {}", name.trim())));
    }
    Ok(())
}
