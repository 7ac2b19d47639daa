use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use adlens_core::{CoreError, FilterError};
use adlens_ingest::IngestError;
use adlens_store::StoreError;

/// Application-level errors that map directly to HTTP responses.
///
/// Every variant implements [`IntoResponse`] so Axum handlers can use
/// `Result<impl IntoResponse, AppError>` as their return type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// A request value was rejected; `field` names where it came from.
    #[error("invalid {field}: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("{message}")]
    MissingHeaders { message: String, missing: Vec<String> },

    #[error("duplicate report: {0}")]
    DuplicateReport(String),

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        let message = err.to_string();
        match err {
            IngestError::MissingHeaders { missing, .. } => {
                AppError::MissingHeaders { message, missing }
            }
            IngestError::Unreadable(_) => AppError::BadRequest(message),
            IngestError::Hash(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { .. } => AppError::DuplicateReport(err.to_string()),
            StoreError::NotFound(id) => AppError::NotFound(format!("report {id} not found")),
        }
    }
}

impl From<FilterError> for AppError {
    fn from(err: FilterError) -> Self {
        AppError::InvalidField {
            field: "filters",
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Filter(e) => e.into(),
            CoreError::InvalidDate(_) => AppError::InvalidField {
                field: "window",
                message: err.to_string(),
            },
            CoreError::UnknownVariant { kind, .. } => AppError::InvalidField {
                field: kind,
                message: err.to_string(),
            },
            CoreError::Export(message) => AppError::Internal(anyhow::anyhow!(message)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
                None,
            ),
            AppError::InvalidField { field, message } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message.clone(),
                Some(field.to_string()),
            ),
            AppError::MissingHeaders { message, missing } => (
                StatusCode::BAD_REQUEST,
                "missing_headers",
                message.clone(),
                Some(missing.join(", ")),
            ),
            AppError::DuplicateReport(msg) => (
                StatusCode::CONFLICT,
                "duplicate_report",
                msg.clone(),
                None,
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                "Payload exceeds size limit".to_string(),
                None,
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message,
                    "field": field
                }
            })),
        )
            .into_response()
    }
}
