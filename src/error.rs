//! HTTP error type. Every failure renders as `{"error": "<message>"}`.

use std::fmt::Display;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Validation or conflict; the message goes to the client unchanged.
    #[error("{0}")]
    BadRequest(String),
    #[error("Please authenticate.")]
    Unauthorized,
    /// Also covers "exists but not yours"; callers cannot tell the two apart.
    #[error("Contract not found")]
    NotFound,
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(err: impl Display) -> Self {
        Self::BadRequest(err.to_string())
    }

    pub fn internal(err: impl Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

// Malformed bodies are client errors like any other validation failure.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_and_messages() {
        assert_eq!(ApiError::bad_request("User already exists").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Unauthorized.to_string(), "Please authenticate.");
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NotFound.to_string(), "Contract not found");
        assert_eq!(ApiError::internal("disk on fire").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::internal("disk on fire").to_string(), "disk on fire");
    }
}
