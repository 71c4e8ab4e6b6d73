use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use thiserror::Error;

use crate::response::ApiResponse;

pub type ApiResult<T> = Result<T, ApiError>;

/// Service-level failure taxonomy. Each variant carries the business code
/// that ends up in the response envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage operation failed: {0}")]
    Storage(#[from] DbErr),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 6001,
            Self::Conflict(_) => 6002,
            Self::Storage(_) => 7000,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            // Log storage failures but keep driver detail out of responses.
            Self::Storage(err) => {
                tracing::error!(error = %err, "storage operation failed");
                "storage operation failed".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ApiResponse::<()>::error(self.code(), message));
        (self.status(), body).into_response()
    }
}
