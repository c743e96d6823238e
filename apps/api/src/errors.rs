use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::feed::reddit::ProviderError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// `InsufficientData` and `AlreadySatisfied` are expected outcomes, not faults;
/// they are never logged at error level.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Already satisfied: {0}")]
    AlreadySatisfied(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for outcomes that are informational rather than failures.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            AppError::InsufficientData(_) | AppError::AlreadySatisfied(_)
        )
    }

    /// Maps a synthesizer failure for the named operation onto the taxonomy.
    pub fn from_llm(operation: &str, err: LlmError) -> Self {
        match err {
            LlmError::Parse(_) | LlmError::NoStructuredBlock | LlmError::EmptyContent => {
                AppError::MalformedResponse(format!("{operation}: {err}"))
            }
            LlmError::Timeout(_) => AppError::Timeout(format!("{operation}: {err}")),
            LlmError::Http(_) | LlmError::Api { .. } => {
                AppError::UpstreamUnavailable(format!("{operation}: {err}"))
            }
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::UpstreamUnavailable(format!("content provider: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::InsufficientData(msg) => {
                tracing::info!("Insufficient data: {msg}");
                (StatusCode::BAD_REQUEST, "INSUFFICIENT_DATA", msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::MalformedResponse(msg) => {
                tracing::error!("Malformed synthesis response: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MALFORMED_RESPONSE",
                    "The AI service returned an unusable response".to_string(),
                )
            }
            AppError::AlreadySatisfied(msg) => {
                tracing::info!("Already satisfied: {msg}");
                (StatusCode::OK, "ALREADY_SATISFIED", msg.clone())
            }
            AppError::StoreUnavailable(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "The record store is unavailable".to_string(),
                )
            }
            AppError::UpstreamUnavailable(msg) => {
                tracing::error!("Upstream error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_UNAVAILABLE",
                    "An upstream service is unavailable".to_string(),
                )
            }
            AppError::Timeout(msg) => {
                tracing::error!("Timeout: {msg}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "TIMEOUT",
                    "The operation timed out".to_string(),
                )
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
