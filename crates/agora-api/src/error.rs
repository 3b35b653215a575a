use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use agora_types::api::ErrorBody;

/// Every failure a handler can surface. Each one ends the request; the
/// client receives the status below and `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidPayload(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Invalid OAuth state")]
    InvalidState,
    #[error("{0}")]
    ProviderExchangeFailed(String),
    #[error("{0}")]
    ProviderProfileFailed(String),
    #[error("Database error")]
    ConnectionFailed(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidPayload(_) | ApiError::InvalidState => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::ProviderExchangeFailed(_)
            | ApiError::ProviderProfileFailed(_)
            | ApiError::ConnectionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::ConnectionFailed(e) = &self {
            error!("Storage failure: {:#}", e);
        }

        let body = ErrorBody {
            error: self.to_string(),
            path: None,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::ConnectionFailed(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidPayload(format!("Invalid payload: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidPayload(format!("Invalid query: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound("Not found".into())
    }
}

/// Trim a required text field, rejecting it when nothing is left.
pub fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidPayload(format!("Invalid payload: {} is required", field)));
    }
    Ok(trimmed.to_string())
}
