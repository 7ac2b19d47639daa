use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use adlens_server::state::AppState;

/// `adlens health`: liveness probe for container health checks.
///
/// Calls `GET http://localhost:$ADLENS_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("ADLENS_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{port}/health");
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }
    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("adlens=info".parse()?),
        )
        .json()
        .init();

    let cfg = adlens_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    info!(
        max_upload_bytes = cfg.max_upload_bytes,
        strict_filters = cfg.strict_filters,
        business_utc_offset_hours = cfg.business_utc_offset_hours,
        ancestry_policy = ?cfg.ancestry_policy,
        "configuration loaded"
    );

    let addr = format!("0.0.0.0:{}", cfg.port);
    let port = cfg.port;
    let state = Arc::new(AppState::in_memory(cfg));
    let app = adlens_server::app::build_app(state);

    info!(port, "adlens listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
