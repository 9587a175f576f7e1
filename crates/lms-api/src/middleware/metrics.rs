//! # Request Metrics
//!
//! HTTP request counters and latency recorded through the `metrics` facade.
//! The binary installs the Prometheus recorder with [`install_recorder`];
//! without one (tests, embedded use) every macro is a no-op.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "lms_http_requests_total";
pub const RESPONSES_TOTAL: &str = "lms_http_responses_total";
pub const REQUEST_DURATION: &str = "lms_http_request_duration_seconds";

/// Install the global Prometheus recorder and describe the HTTP metrics.
///
/// Fails if a recorder is already installed in this process.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(REQUESTS_TOTAL, "Total HTTP requests received");
    describe_counter!(
        RESPONSES_TOTAL,
        "Total HTTP responses by status class (2xx, 4xx, 5xx)"
    );
    describe_histogram!(REQUEST_DURATION, "HTTP request duration in seconds");

    Ok(handle)
}

/// Status class label for a response code.
fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Middleware that counts requests and responses and times each request.
///
/// The route template (`/v1/courses/{course_id}`) is used as the path label
/// so ids do not explode label cardinality.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let started = Instant::now();

    counter!(REQUESTS_TOTAL, "method" => method.clone()).increment(1);

    let response = next.run(request).await;

    let class = status_class(response.status().as_u16());
    counter!(RESPONSES_TOTAL, "class" => class).increment(1);
    histogram!(REQUEST_DURATION, "method" => method, "path" => path)
        .record(started.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(status_class(200), "2xx");
        assert_eq!(status_class(201), "2xx");
        assert_eq!(status_class(404), "4xx");
        assert_eq!(status_class(422), "4xx");
        assert_eq!(status_class(500), "5xx");
    }
}
