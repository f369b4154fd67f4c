use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use fundraise_types::api::Envelope;

pub type ApiResult<T> = Result<T, ApiError>;

/// Every failure a handler can surface. Each variant maps to one HTTP status
/// and is rendered into the standard response envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input, one message per field.
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// Bad credentials at login.
    #[error("{0}")]
    Auth(String),

    /// Missing, invalid or expired session token.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// Avatar upload failure; rendered with `is_uploaded: false`.
    #[error("{0}")]
    Upload(String),

    #[error("{0}")]
    Conflict(String),

    /// The uploaded file could not be written.
    #[error("Failed to store file: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Auth(_)
            | ApiError::BadRequest(_)
            | ApiError::Upload(_)
            | ApiError::Storage(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn headline(&self) -> String {
        match self {
            ApiError::Auth(_) => "Login failed".into(),
            ApiError::Unauthorized(_) => "Unauthorized".into(),
            ApiError::NotFound(_) => "Resource not found".into(),
            ApiError::Upload(msg) => msg.clone(),
            ApiError::Storage(_) => "Failed to upload file".into(),
            ApiError::Internal(_) => "Internal server error".into(),
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::Conflict(_) => {
                "Failed to process request".into()
            }
        }
    }

    fn data(&self) -> Option<Value> {
        match self {
            ApiError::Validation(errors) => Some(json!({ "errors": errors })),
            ApiError::Upload(_) => Some(json!({ "is_uploaded": false })),
            // Never leak internal details to the client
            ApiError::Internal(_) => None,
            other => Some(json!({ "errors": [other.to_string()] })),
        }
    }

    fn log(&self) {
        match self {
            ApiError::Internal(e) => tracing::error!(error = %e, "Request failed"),
            ApiError::Storage(msg) => tracing::error!(error = %msg, "Upload storage failure"),
            ApiError::Auth(_) => tracing::warn!("Invalid login attempt"),
            _ => tracing::debug!(error = %self, "Request rejected"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        let body = Envelope::failed(self.headline(), status.as_u16(), self.data());
        (status, Json(body)).into_response()
    }
}

/// Wrap `data` in a success envelope with the given status.
pub fn reply<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    (status, Json(Envelope::success(message, status.as_u16(), data))).into_response()
}
