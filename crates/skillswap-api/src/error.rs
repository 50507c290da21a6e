//! API error type mapping to HTTP status codes and the JSON error envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use skillswap_db::StoreError;
use skillswap_types::api::{ErrorBody, ErrorDetail};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("interest already declared for this skill and role")]
    DuplicateDeclaration,

    #[error("missing or invalid token")]
    Unauthorized,

    #[error("not allowed")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("internal server error")]
    Internal,
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateDeclaration => ApiError::DuplicateDeclaration,
            StoreError::SelfMatch => ApiError::Validation(e.to_string()),
            StoreError::MatchExists | StoreError::UsernameTaken(_) | StoreError::SkillExists(_) => {
                ApiError::Conflict(e.to_string())
            }
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::MissingReference => ApiError::NotFound("referenced resource"),
            StoreError::Forbidden => ApiError::Forbidden,
            StoreError::Sqlite(_) | StoreError::Internal(_) => {
                error!("Storage failure: {}", e);
                ApiError::Internal
            }
        }
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::DuplicateDeclaration => (StatusCode::BAD_REQUEST, "DUPLICATE_DECLARATION"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
