use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// `message` is shown to the user; `detail` is the underlying cause.
    #[error("Service error: {detail}")]
    Service { message: String, detail: String },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, detail) = match &self {
            AppError::MissingInput(msg) => {
                (StatusCode::BAD_REQUEST, "MISSING_INPUT", msg.clone(), None)
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::UnsupportedMediaType(media_type) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_MEDIA_TYPE",
                format!("Cannot read files of type '{media_type}'. Upload a PDF, DOCX, PNG or JPEG."),
                None,
            ),
            AppError::Extraction(e) => {
                tracing::warn!("Extraction error: {e}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "EXTRACTION_ERROR",
                    e.to_string(),
                    None,
                )
            }
            AppError::Service { message, detail } => {
                tracing::error!("LLM service error: {detail}");
                (
                    StatusCode::BAD_GATEWAY,
                    "SERVICE_ERROR",
                    message.clone(),
                    Some(detail.clone()),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(detail) = detail {
            error["detail"] = json!(detail);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
