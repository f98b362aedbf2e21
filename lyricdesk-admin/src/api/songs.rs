//! Song endpoints
//!
//! `POST /api/songs` is an action endpoint: the body names an `action` and
//! carries an optional `id` and `data` payload.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use lyricdesk_common::db::{Song, SongFilter, SongPatch, SongStatus, MODERATION_COLUMNS, SONG_COLUMNS};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::extract::{ApiJson, ApiQuery};
use super::import::import_response;
use crate::import::{normalize, records_from_payload, BatchImporter, NormalizeContext, RawRecord};
use crate::moderation::{decision_patch, Decision};
use crate::{ApiError, ApiResult, AppState};

/// Body of `POST /api/songs`
#[derive(Debug, Default, Deserialize)]
pub struct SongActionRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Query of `GET /api/songs`
#[derive(Debug, Default, Deserialize)]
pub struct SongListQuery {
    pub q: Option<String>,
    pub status: Option<String>,
}

/// GET /api/songs
pub async fn list_songs(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SongListQuery>,
) -> ApiResult<Json<Vec<Song>>> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(s.parse::<SongStatus>()?),
    };
    let filter = SongFilter {
        query: query.q,
        status,
    };
    Ok(Json(state.catalog.list_songs(&filter).await?))
}

/// POST /api/songs
pub async fn song_action(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SongActionRequest>,
) -> ApiResult<Response> {
    let action = request
        .action
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing action".to_string()))?;

    match action {
        "insert" => insert(&state, request.data).await,
        "update" => update(&state, request.id, request.data).await,
        "moderation" => moderate(&state, request.id, request.data).await,
        "delete" => delete(&state, request.id).await,
        "bulk_insert" => bulk_insert(&state, request.data).await,
        "bulk_delete" => bulk_delete(&state, request.data).await,
        "bulk_update" => bulk_update(&state, request.data).await,
        _ => Err(ApiError::BadRequest("Unknown action".to_string())),
    }
}

fn ok() -> Response {
    Json(json!({ "ok": true })).into_response()
}

fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

fn require_id(id: Option<String>) -> Option<String> {
    id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty())
}

/// Non-empty array of non-empty string ids
fn id_list(value: Option<&Value>) -> Option<Vec<String>> {
    let ids: Vec<String> = value?
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
        .collect::<Option<_>>()?;
    (!ids.is_empty()).then_some(ids)
}

async fn insert(state: &AppState, data: Option<Value>) -> ApiResult<Response> {
    let data = present(data).ok_or_else(|| ApiError::BadRequest("Missing data".to_string()))?;

    let ctx = NormalizeContext {
        categories: &[],
        csv_language: &state.import.csv_language,
    };
    let song = normalize(&RawRecord::Json(data), &ctx)?;
    state.catalog.insert_songs(std::slice::from_ref(&song)).await?;

    info!(title = %song.title, "Inserted song");
    Ok(ok())
}

async fn update(state: &AppState, id: Option<String>, data: Option<Value>) -> ApiResult<Response> {
    let (id, data) = match (require_id(id), present(data)) {
        (Some(id), Some(data)) => (id, data),
        _ => return Err(ApiError::BadRequest("Missing id or data".to_string())),
    };

    let patch = SongPatch::from_json(&data, SONG_COLUMNS)?;
    state.catalog.update_song(&id, &patch).await?;

    info!(song_id = %id, fields = patch.fields().len(), "Updated song");
    Ok(ok())
}

async fn moderate(state: &AppState, id: Option<String>, data: Option<Value>) -> ApiResult<Response> {
    let (id, data) = match (require_id(id), present(data)) {
        (Some(id), Some(data)) => (id, data),
        _ => return Err(ApiError::BadRequest("Missing id or data".to_string())),
    };

    let patch = match data.get("decision") {
        Some(raw) => {
            let decision: Decision = serde_json::from_value(raw.clone())
                .map_err(|_| ApiError::BadRequest(format!("Unknown decision: {}", raw)))?;
            let song = state
                .catalog
                .get_song(&id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Song not found: {}", id)))?;
            decision_patch(decision, &song)?
        }
        None => SongPatch::from_json(&data, MODERATION_COLUMNS)?,
    };
    state.catalog.update_song(&id, &patch).await?;

    info!(song_id = %id, "Applied moderation");
    Ok(ok())
}

async fn delete(state: &AppState, id: Option<String>) -> ApiResult<Response> {
    let id = require_id(id).ok_or_else(|| ApiError::BadRequest("Missing id".to_string()))?;
    state.catalog.delete_song(&id).await?;

    info!(song_id = %id, "Deleted song");
    Ok(ok())
}

async fn bulk_insert(state: &AppState, data: Option<Value>) -> ApiResult<Response> {
    let records = records_from_payload(data)?;
    let outcome = BatchImporter::new(&*state.catalog, state.import_options())
        .run(records)
        .await?;
    Ok(import_response(outcome))
}

async fn bulk_delete(state: &AppState, data: Option<Value>) -> ApiResult<Response> {
    let ids = id_list(data.as_ref())
        .ok_or_else(|| ApiError::BadRequest("Missing ids array".to_string()))?;
    let deleted = state.catalog.delete_songs(&ids).await?;

    info!(requested = ids.len(), deleted, "Bulk deleted songs");
    Ok(Json(json!({ "ok": true, "deleted": deleted })).into_response())
}

async fn bulk_update(state: &AppState, data: Option<Value>) -> ApiResult<Response> {
    let data = present(data).unwrap_or(Value::Null);
    let (ids, updates) = match (id_list(data.get("ids")), data.get("updates")) {
        (Some(ids), Some(updates)) => (ids, updates),
        _ => return Err(ApiError::BadRequest("Missing ids or updates".to_string())),
    };

    let patch = SongPatch::from_json(updates, SONG_COLUMNS)?;
    let updated = state.catalog.update_songs(&ids, &patch).await?;

    info!(requested = ids.len(), updated, "Bulk updated songs");
    Ok(Json(json!({ "ok": true, "updated": updated })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_list() {
        assert_eq!(
            id_list(Some(&json!(["a", " b "]))),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(id_list(Some(&json!([]))), None);
        assert_eq!(id_list(Some(&json!(["a", 1]))), None);
        assert_eq!(id_list(Some(&json!("a"))), None);
        assert_eq!(id_list(None), None);
    }
}
