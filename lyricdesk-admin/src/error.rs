//! Error types for lyricdesk-admin

use axum::{
    extract::rejection::{JsonRejection, QueryRejection, StringRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::import::{RequestError, ValidationError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Conflict (409)
    #[error("{0}")]
    Conflict(String),

    /// Missing or wrong admin key (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// lyricdesk-common error that has no more specific status
    #[error("{0}")]
    Common(lyricdesk_common::Error),
}

impl From<lyricdesk_common::Error> for ApiError {
    fn from(err: lyricdesk_common::Error) -> Self {
        use lyricdesk_common::Error;

        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            // The hosted service answers bad requests with its own message
            Error::Backend(msg) => ApiError::BadRequest(msg),
            Error::Database(sqlx::Error::Database(db_err)) => {
                ApiError::BadRequest(db_err.message().to_string())
            }
            other => ApiError::Common(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<StringRejection> for ApiError {
    fn from(rejection: StringRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) | ApiError::Other(_) | ApiError::Common(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_errors_map_to_status() {
        let not_found: ApiError = lyricdesk_common::Error::NotFound("Song not found".into()).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let invalid: ApiError =
            lyricdesk_common::Error::InvalidInput("Unknown column: x".into()).into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let internal: ApiError = lyricdesk_common::Error::Internal("boom".into()).into();
        assert_eq!(internal.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_backend_message_passes_through() {
        let err: ApiError = lyricdesk_common::Error::Backend("User already registered".into()).into();
        assert_eq!(err.to_string(), "User already registered");
    }
}
