//! Axum middleware emitting per-request telemetry
//!
//! Each interceptor is an `axum::middleware::from_fn_with_state` function with
//! its own shared state, so they compose independently. [`HttpTelemetry`]
//! layers all three in the required order.

pub mod handler_errors;
pub mod logging;
pub mod metrics;
pub mod telemetry;
pub mod tracing;

pub use handler_errors::HandlerErrors;
pub use logging::{HttpLogging, logging_middleware};
pub use metrics::{HttpMetrics, HttpMetricsBuilder, metrics_middleware};
pub use telemetry::HttpTelemetry;
pub use tracing::{HttpTracing, tracing_middleware};
