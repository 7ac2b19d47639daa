use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use adlens_core::model::ReportSource;

use crate::{error::AppError, state::AppState};

const MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub source: String,
    pub filename: Option<String>,
}

/// `GET /api/reports`: summaries of every loaded report, in upload order.
#[tracing::instrument(skip(state))]
pub async fn list_reports(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let summaries = state.reports.summaries().await;
    Json(json!({ "data": summaries }))
}

/// `POST /api/reports?source=..&filename=..`: ingest one raw export.
///
/// The body is the delimited text exactly as exported. Rejections:
/// unknown source or unreadable text → 400 `validation_error`; required
/// headers absent → 400 `missing_headers`; content already loaded → 409
/// `duplicate_report`; body over the upload cap → 413.
#[tracing::instrument(skip(state, body), fields(source = %q.source))]
pub async fn upload_report(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UploadQuery>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, AppError> {
    let source = ReportSource::parse(&q.source).map_err(|e| AppError::InvalidField {
        field: "source",
        message: e.to_string(),
    })?;
    let filename = validate_filename(q.filename.as_deref(), source)?;

    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            warn!(limit = state.config.max_upload_bytes, "upload over size limit");
            AppError::PayloadTooLarge
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    })?;
    let text = String::from_utf8(body.to_vec())
        .map_err(|_| AppError::BadRequest("report is not valid UTF-8 text".to_string()))?;

    let (report, summary) = tokio::task::spawn_blocking(move || {
        adlens_ingest::normalize_at(source, &filename, &text, chrono::Utc::now())
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("normalize task failed: {e}")))??;

    let stored = state.reports.add(report).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "data": stored.summary(),
            "ingest": summary
        })),
    ))
}

/// `DELETE /api/reports/{id}`: unload one report.
#[tracing::instrument(skip(state))]
pub async fn delete_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.reports.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_filename(raw: Option<&str>, source: ReportSource) -> Result<String, AppError> {
    let Some(name) = raw.map(str::trim).filter(|name| !name.is_empty()) else {
        return Ok(format!("{source}.csv"));
    };
    if name.len() > MAX_FILENAME_LEN {
        return Err(AppError::InvalidField {
            field: "filename",
            message: format!("filename must be {MAX_FILENAME_LEN} bytes or fewer"),
        });
    }
    Ok(name.to_string())
}
