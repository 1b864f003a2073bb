//! Envelope for error responses and the read endpoints.
//!
//! ```json
//! {
//!   "data": { ... },
//!   "meta": { "requestId": "...", "timestamp": "..." },
//!   "errors": [{ "code": "NOT_FOUND", "message": "..." }]
//! }
//! ```
//!
//! The turn endpoint answers with the bare turn envelope instead.

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub meta: ApiMeta,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMeta {
    pub request_id: String,
    /// RFC 3339 time the response was built.
    pub timestamp: String,
}

impl ApiMeta {
    fn now() -> Self {
        Self {
            request_id: uuid::Uuid::now_v7().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Machine-readable code plus a human-readable message.
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            meta: ApiMeta::now(),
            errors: Vec::new(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            data: None,
            meta: ApiMeta::now(),
            errors: vec![ApiErrorDetail {
                code: code.to_string(),
                message: message.into(),
            }],
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
