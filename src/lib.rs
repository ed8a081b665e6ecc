//! Per-request telemetry for axum services.
//!
//! Three independently composable middleware record correlated signals for
//! every request that is not excluded:
//! - [`metrics_middleware`]: concurrency gauge, call counter and duration histogram
//! - [`tracing_middleware`]: an OpenTelemetry server span with a mapped outcome
//! - [`logging_middleware`]: one structured access record with trace correlation
//!
//! [`HttpTelemetry`] builds all three from a [`TelemetryConfig`] and layers them
//! onto a router.

pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

pub use config::{LoggingConfig, ServiceConfig, TelemetryConfig, load_config};
pub use error::{TelemetryError, TelemetryResult};
pub use middleware::{
    HandlerErrors, HttpLogging, HttpMetrics, HttpTelemetry, HttpTracing, logging_middleware,
    metrics_middleware, tracing_middleware,
};
pub use observability::{
    ExcludedPaths, LogSink, RequestAttributes, SpanStarter, TracingLogSink, init_logging,
    prometheus_registry,
};
