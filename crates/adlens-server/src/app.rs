use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware is applied in outer-to-inner order (outermost runs first on
/// request, last on response):
///
/// 1. `CorsLayer`: any origin unless `ADLENS_CORS_ORIGINS` lists some.
/// 2. `TraceLayer`: structured request/response logging via `tracing`.
/// 3. `DefaultBodyLimit`: caps uploads at `max_upload_bytes`.
pub fn build_app(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/sources", get(routes::sources::list_sources))
        .route(
            "/api/reports",
            get(routes::reports::list_reports).post(routes::reports::upload_report),
        )
        .route("/api/reports/{id}", delete(routes::reports::delete_report))
        .route("/api/analysis", post(routes::analysis::run_analysis))
        .route("/api/analysis/export", post(routes::analysis::export_analysis))
        .route("/api/analysis/navigate", post(routes::analysis::navigate))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
