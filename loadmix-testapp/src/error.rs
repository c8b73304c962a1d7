use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Failure boundary for handlers.
///
/// Anything a handler bubbles up lands here and becomes a 500 JSON
/// response carrying a generic error plus the source message; the process
/// keeps serving other requests.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Body for expected, non-fatal rejections (400/502/503 responses).
#[derive(Debug, Serialize)]
pub struct RejectBody {
    pub error: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");

        let body = ErrorBody {
            error: "internal server error",
            message: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
