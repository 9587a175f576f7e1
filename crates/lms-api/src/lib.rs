//! # lms-api — Axum API Services for the LMS
//!
//! HTTP surface of the learning management backend: course authoring,
//! role-based course visibility, the enrollment lifecycle, and the
//! submission and grading workflow.
//!
//! ## API Surface
//!
//! | Prefix                           | Module                   | Domain          |
//! |----------------------------------|--------------------------|-----------------|
//! | `/v1/auth/*`                     | [`routes::users`]        | Registration    |
//! | `/v1/courses/*`                  | [`routes::courses`]      | Courses, lessons, assignments |
//! | `/v1/enrollments/*`, `…/enroll`  | [`routes::enrollments`]  | Enrollments     |
//! | `/v1/submissions/*`, `…/submissions` | [`routes::submissions`] | Submissions  |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! The auth middleware never rejects; it resolves an [`auth::Actor`] that
//! every service call receives explicitly.
//!
//! ## OpenAPI
//!
//! Auto-generated OpenAPI 3.1 document via utoipa at `/openapi.json`.

pub mod auth;
pub mod bootstrap;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health checks (`/health/*`) and `/metrics` are mounted outside the API
/// middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        secret: state.config.auth_secret.clone(),
    };

    let api = Router::new()
        .merge(routes::users::router())
        .merge(routes::courses::router())
        .merge(routes::enrollments::router())
        .merge(routes::submissions::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(render_metrics))
        .with_state(state);

    Router::new().merge(ops).merge(api)
}

/// Liveness check. Always returns 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check. Returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}

/// Prometheus exposition, or 404 when no recorder was installed.
async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}
