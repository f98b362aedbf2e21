//! File import endpoint and the shared import response

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::extract::{ApiQuery, TextBody};
use crate::import::{records_from_file, BatchImporter, FileFormat, ImportOutcome};
use crate::{ApiError, ApiResult, AppState};

/// Import result as sent to clients
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    /// True only when every record was inserted
    pub ok: bool,
    #[serde(flatten)]
    pub outcome: ImportOutcome,
}

/// 200 when every record was inserted, 207 when some were skipped or failed
pub fn import_response(outcome: ImportOutcome) -> Response {
    let ok = outcome.is_complete();
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    (status, Json(ImportResponse { ok, outcome })).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    pub format: Option<String>,
}

/// POST /api/songs/import?format=csv|json
///
/// The request body is the file itself. Without `format`, the
/// `Content-Type` header decides.
pub async fn import_file(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ImportQuery>,
    headers: HeaderMap,
    TextBody(body): TextBody,
) -> ApiResult<Response> {
    let format = match query.format.as_deref() {
        Some(format) => format.parse::<FileFormat>()?,
        None => headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(FileFormat::from_content_type)
            .ok_or_else(|| {
                ApiError::BadRequest("Specify format=csv or format=json".to_string())
            })?,
    };

    let records = records_from_file(&body, format)?;
    info!(%format, records = records.len(), "Importing file");

    let outcome = BatchImporter::new(&*state.catalog, state.import_options())
        .run(records)
        .await?;
    Ok(import_response(outcome))
}
