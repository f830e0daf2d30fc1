use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use counsel_core::CounselError;
use serde_json::json;

/// Handler error: a status code plus `{ "error": message }`.
#[derive(Debug)]
pub struct ApiError(pub CounselError);

impl From<CounselError> for ApiError {
    fn from(e: CounselError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CounselError::invalid_input(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.0.is_client_error() {
            tracing::info!(status = %status, "rejected request: {}", self.0);
        } else {
            tracing::error!(status = %status, "request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.public_message() }))).into_response()
    }
}
