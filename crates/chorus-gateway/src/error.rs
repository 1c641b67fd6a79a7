//! API errors and their JSON bodies

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chorus_core::HubError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Invalid API key")]
    Unauthorized,
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::SessionNotFound(_) => ApiError::NotFound,
            HubError::InvalidRequest(msg) => ApiError::Validation(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            detail: String,
        }

        let status = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        };
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_errors_map_to_status() {
        let not_found: ApiError = HubError::SessionNotFound("abc".into()).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let invalid: ApiError = HubError::InvalidRequest("prompt must not be empty".into()).into();
        assert_eq!(invalid.to_string(), "prompt must not be empty");
        assert_eq!(
            invalid.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_not_found_detail_hides_id() {
        let err: ApiError = HubError::SessionNotFound("secret-id".into()).into();
        assert_eq!(err.to_string(), "Session not found");
    }
}
