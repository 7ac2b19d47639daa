use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use adlens_core::model::{ReportSide, ReportSource};
use adlens_ingest::required_headers;

#[derive(Debug, Serialize)]
struct SourceInfo {
    source: ReportSource,
    side: ReportSide,
    required_headers: Vec<&'static str>,
}

/// `GET /api/sources`: the export formats an upload may declare, with the
/// headers each one must carry.
pub async fn list_sources() -> Json<Value> {
    let sources: Vec<SourceInfo> = ReportSource::ALL
        .into_iter()
        .map(|source| SourceInfo {
            source,
            side: source.side(),
            required_headers: required_headers(source),
        })
        .collect();
    Json(json!({ "data": sources }))
}
