use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Request-level failure. Every variant is reported to the caller as
/// `400 Bad Request` with `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Only CSV files are supported (got {0})")]
    UnsupportedFileType(String),
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request<E: ToString>(msg: E) -> Self {
        Self::BadRequest(msg.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Upstream(err) => {
                tracing::error!("Request failed: {:#}", err);
                format!("{:#}", err)
            }
            other => {
                tracing::warn!("Rejected request: {}", other);
                other.to_string()
            }
        };
        (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
