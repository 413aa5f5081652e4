use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mizan_core::DocumentError;
use mizan_engine::EngineError;
use serde_json::json;
use thiserror::Error;

/// Error body is always `{error: <label>, message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<DocumentError> for ApiError {
    fn from(e: DocumentError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

impl ApiError {
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::Engine(e) => e.label(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Engine(e) if e.is_input_error() => StatusCode::BAD_REQUEST,
            Self::Engine(e) if e.is_inference_unavailable() => StatusCode::BAD_GATEWAY,
            Self::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = self.label(), message = %self, "request failed");
        } else {
            tracing::debug!(error = self.label(), message = %self, "request rejected");
        }
        (
            status,
            Json(json!({"error": self.label(), "message": self.to_string()})),
        )
            .into_response()
    }
}
