//! Profile listing, editing and CSV export

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use lyricdesk_common::db::{Profile, ProfileFilter, ProfilePatch};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::extract::{ApiJson, ApiQuery};
use crate::{ApiError, ApiResult, AppState};

const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Query of the profile listing and export
#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub q: Option<String>,
    pub role: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProfileQuery {
    fn into_filter(self) -> ProfileFilter {
        ProfileFilter {
            query: self.q,
            role: self.role,
            page: self.page.unwrap_or(0),
            limit: self
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileListResponse {
    pub profiles: Vec<Profile>,
    pub total: i64,
}

/// GET /api/profiles
pub async fn list_profiles(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProfileQuery>,
) -> ApiResult<Json<ProfileListResponse>> {
    let page = state.catalog.list_profiles(&query.into_filter()).await?;
    Ok(Json(ProfileListResponse {
        profiles: page.items,
        total: page.total,
    }))
}

/// PATCH /api/profiles/:id
pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> ApiResult<Json<Value>> {
    if patch.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }
    state.catalog.update_profile(&id, &patch).await?;

    info!(profile_id = %id, "Updated profile");
    Ok(Json(json!({ "ok": true })))
}

/// GET /api/profiles/export
///
/// Exports the page selected by the same query the listing takes.
pub async fn export_profiles(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProfileQuery>,
) -> ApiResult<Response> {
    let page = state.catalog.list_profiles(&query.into_filter()).await?;
    let body = profiles_csv(&page.items)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"profiles.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

/// Every field quoted, booleans as `true`/`false`
fn profiles_csv(profiles: &[Profile]) -> ApiResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    let write_err = |e: csv::Error| ApiError::Internal(format!("CSV export failed: {}", e));
    writer
        .write_record(["id", "email", "role", "is_admin", "invited", "deactivated", "banned"])
        .map_err(write_err)?;
    for p in profiles {
        writer
            .write_record([
                p.id.as_str(),
                p.email.as_deref().unwrap_or(""),
                p.role.as_deref().unwrap_or(""),
                bool_str(p.is_admin),
                bool_str(p.invited),
                bool_str(p.deactivated),
                bool_str(p.banned),
            ])
            .map_err(write_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_quotes_every_field() {
        let mut profile = Profile::new("u1", "a\"b@example.com");
        profile.is_admin = true;
        let csv = profiles_csv(&[profile]).unwrap();
        assert_eq!(
            csv,
            "\"id\",\"email\",\"role\",\"is_admin\",\"invited\",\"deactivated\",\"banned\"\n\
             \"u1\",\"a\"\"b@example.com\",\"\",\"true\",\"false\",\"false\",\"false\"\n"
        );
    }

    #[test]
    fn test_page_size_is_clamped() {
        let filter = ProfileQuery {
            limit: Some(10_000),
            ..Default::default()
        }
        .into_filter();
        assert_eq!(filter.limit, MAX_PAGE_SIZE);
        assert_eq!(filter.page, 0);

        let filter = ProfileQuery::default().into_filter();
        assert_eq!(filter.limit, DEFAULT_PAGE_SIZE);
    }
}
