use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Response bodies are `{"detail": "..."}` — the contract the API's clients
/// already depend on.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid file format. Allowed: {0}")]
    InvalidFormat(String),

    #[error("Audio file not found: {0}")]
    ResourceNotFound(String),

    #[error("{stage} failed: {message}")]
    Provider { stage: ProviderStage, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Which outbound call failed. Used for error messages and logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStage {
    Transcription,
    ResponseGeneration,
}

impl std::fmt::Display for ProviderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderStage::Transcription => write!(f, "Transcription"),
            ProviderStage::ResponseGeneration => write!(f, "Response generation"),
        }
    }
}

impl AppError {
    pub fn transcription(message: impl Into<String>) -> Self {
        AppError::Provider {
            stage: ProviderStage::Transcription,
            message: message.into(),
        }
    }

    pub fn response_generation(message: impl Into<String>) -> Self {
        AppError::Provider {
            stage: ProviderStage::ResponseGeneration,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::InvalidFormat(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::ResourceNotFound(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Provider { stage, message } => {
                tracing::error!("{stage} error: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({ "detail": detail }));

        (status, body).into_response()
    }
}
