use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use adlens_core::date_window::{DatePreset, DateWindow, DATE_FORMAT};
use adlens_core::drill::{AnalysisState, DrillAction};
use adlens_core::export::{export, Delimiter};
use adlens_core::filter::validate_all;
use adlens_core::format::{format_record, format_totals};
use adlens_core::model::Dataset;
use adlens_core::{RollupQuery, RollupResult};

use crate::{error::AppError, state::AppState};

/// Body of `POST /api/analysis` and `POST /api/analysis/export`: a rollup
/// query, optionally with a named window that replaces `window`.
#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    #[serde(flatten)]
    pub query: RollupQuery,
    #[serde(default)]
    pub preset: Option<DatePreset>,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    #[serde(default)]
    pub state: AnalysisState,
    pub action: DrillAction,
}

/// `POST /api/analysis`: one page of rollup records plus the totals row over
/// every filtered record.
#[tracing::instrument(skip(state, req), fields(level = req.query.level.as_str()))]
pub async fn run_analysis(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalysisRequest>,
) -> Result<Json<Value>, AppError> {
    let query = prepare_query(&state, req.query, req.preset)?;
    let (query, result) = compute(&state, query).await?;
    Ok(Json(json!({ "data": rollup_body(&query, &result) })))
}

/// `POST /api/analysis/navigate`: apply one drill-down transition to a
/// client-held state and return the new state with its rollup.
#[tracing::instrument(skip(state, req))]
pub async fn navigate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NavigateRequest>,
) -> Result<Json<Value>, AppError> {
    let NavigateRequest {
        state: mut analysis,
        action,
    } = req;
    analysis.apply(action);
    if analysis.ancestry.is_none() {
        analysis.ancestry = Some(state.config.ancestry_policy);
    }

    let query = prepare_query(&state, analysis.query(), None)?;
    let (query, result) = compute(&state, query).await?;
    Ok(Json(json!({
        "data": {
            "state": analysis,
            "result": rollup_body(&query, &result)
        }
    })))
}

/// `POST /api/analysis/export?format=csv|tsv`: every filtered and sorted
/// record (not just one page) as a delimited attachment.
#[tracing::instrument(skip(state, req))]
pub async fn export_analysis(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportParams>,
    Json(req): Json<AnalysisRequest>,
) -> Result<Response, AppError> {
    let delimiter =
        Delimiter::parse(params.format.as_deref()).map_err(|e| AppError::InvalidField {
            field: "format",
            message: e.to_string(),
        })?;
    let query = prepare_query(&state, req.query, req.preset)?;
    let filename = format!(
        "adlens-{}-{}.{}",
        query.level.as_str(),
        window_label(&query.window),
        delimiter.extension()
    );

    let dataset = state.reports.dataset().await;
    let text = tokio::task::spawn_blocking(move || {
        let records = dataset.rollup_records(&query);
        export(&records, delimiter)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("export task failed: {e}")))??;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, delimiter.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(text))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("response build failed: {e}")))
}

/// Resolve the preset, fill the default ancestry policy and, in strict mode,
/// reject filters that would otherwise pass every record.
fn prepare_query(
    state: &AppState,
    mut query: RollupQuery,
    preset: Option<DatePreset>,
) -> Result<RollupQuery, AppError> {
    if let Some(preset) = preset {
        query.window = preset.resolve(state.business_today());
    }
    if query.ancestry.is_none() {
        query.ancestry = Some(state.config.ancestry_policy);
    }
    if state.config.strict_filters {
        validate_all(&query.filters)?;
    }
    Ok(query)
}

async fn compute(
    state: &AppState,
    query: RollupQuery,
) -> Result<(RollupQuery, RollupResult), AppError> {
    let dataset: Dataset = state.reports.dataset().await;
    tokio::task::spawn_blocking(move || {
        let result = dataset.rollup(&query);
        (query, result)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("rollup task failed: {e}")))
}

fn rollup_body(query: &RollupQuery, result: &RollupResult) -> Value {
    let formatted_page: Vec<_> = result.page.iter().map(format_record).collect();
    json!({
        "level": query.level,
        "window": query.window,
        "totals": result.totals,
        "formatted_totals": format_totals(&result.totals),
        "page": result.page,
        "formatted_page": formatted_page,
        "page_number": result.page_number,
        "total_pages": result.total_pages,
        "total_records": result.total_records
    })
}

fn window_label(window: &DateWindow) -> String {
    match (window.from, window.to) {
        (Some(from), Some(to)) => format!(
            "{}-{}",
            from.format(DATE_FORMAT),
            to.format(DATE_FORMAT)
        ),
        _ => "empty".to_string(),
    }
}
