//! Application error type mapping to HTTP status codes and the error envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use sitepilot_types::error::{RepositoryError, TurnError};

use super::response::ApiResponse;

#[derive(Debug)]
pub enum AppError {
    Turn(TurnError),
    Repository(RepositoryError),
    Unauthorized(String),
    NotFound(String),
    Validation(String),
    Internal(String),
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        AppError::Turn(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl AppError {
    /// Status, machine code and message for the envelope.
    ///
    /// Collaborator failures are logged here and answered opaquely.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Turn(TurnError::NotFound(what)) | AppError::NotFound(what) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", format!("Not found: {what}"))
            }
            AppError::Repository(RepositoryError::NotFound) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "Not found".to_string())
            }
            AppError::Turn(TurnError::Unauthorized(msg)) | AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            AppError::Turn(TurnError::Precondition(msg)) => {
                (StatusCode::CONFLICT, "PRECONDITION_FAILED", msg.clone())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Turn(e) => {
                tracing::error!(error = %e, "turn failed");
                internal()
            }
            AppError::Repository(e) => {
                tracing::error!(error = %e, "storage failure");
                internal()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                internal()
            }
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "Something went wrong on our side. Please try again.".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        (status, ApiResponse::error(code, message)).into_response()
    }
}
