//! # Middleware Stack
//!
//! Tower middleware for the API layer:
//! - [`metrics`]: request counters and latency via the `metrics` facade.
//! - Request tracing is `tower_http::trace::TraceLayer`, applied in [`crate::app`].
//! - Authentication lives in [`crate::auth`].

pub mod metrics;
