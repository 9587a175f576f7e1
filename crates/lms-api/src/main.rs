//! # lms-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the LMS API.
//! Binds to configurable port (default 8080).

use lms_api::state::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Structured tracing; LOG_FORMAT=json switches to JSON lines.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env();
    tracing::info!(?config, "configuration loaded");
    if config.auth_secret.is_none() {
        tracing::warn!("LMS_AUTH_SECRET not set, bearer e-mails are trusted without a secret");
    }
    let port = config.port;

    let metrics = lms_api::middleware::metrics::install_recorder().map_err(|e| {
        tracing::error!("Metrics recorder installation failed: {e}");
        e
    })?;

    // Optional database pool; absent means in-memory only.
    let db_pool = lms_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let state = lms_api::bootstrap::bootstrap(config, db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Bootstrap failed: {e}");
            e
        })?
        .with_metrics(metrics);

    let app = lms_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("LMS API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
