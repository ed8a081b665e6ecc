//! All three interceptors wired together

use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state};
use metrics::Recorder;

use super::logging::{HttpLogging, logging_middleware};
use super::metrics::{HttpMetrics, metrics_middleware};
use super::tracing::{HttpTracing, tracing_middleware};
use crate::config::TelemetryConfig;
use crate::error::TelemetryResult;
use crate::observability::exclusion::ExcludedPaths;
use crate::observability::logging::TracingLogSink;
use crate::observability::tracing::SpanStarter;

/// Metrics, tracing and logging state for one API.
#[derive(Clone)]
pub struct HttpTelemetry {
    pub metrics: Arc<HttpMetrics>,
    pub tracing: Arc<HttpTracing>,
    pub logging: Arc<HttpLogging>,
}

impl HttpTelemetry {
    pub fn new(metrics: HttpMetrics, tracing: HttpTracing, logging: HttpLogging) -> Self {
        Self {
            metrics: Arc::new(metrics),
            tracing: Arc::new(tracing),
            logging: Arc::new(logging),
        }
    }

    /// Build all three from configuration, sharing one exclusion set. Access
    /// logs go to a [`TracingLogSink`] tagged with the configured service.
    pub fn from_config(
        config: &TelemetryConfig,
        registry: Arc<dyn Recorder + Send + Sync>,
        tracer: Arc<dyn SpanStarter>,
    ) -> TelemetryResult<Self> {
        let excluded = Arc::new(ExcludedPaths::new(&config.excluded_paths));

        let metrics = HttpMetrics::builder()
            .registry(registry)
            .namespace(&config.namespace)
            .api_name(&config.api_name)
            .excluded_paths(excluded.clone())
            .build()?;

        let tracing = HttpTracing::new(tracer).with_excluded_paths(excluded.clone());

        let logging = HttpLogging::new(Arc::new(TracingLogSink::from_config(&config.service)))
            .with_excluded_paths(excluded);

        Ok(Self::new(metrics, tracing, logging))
    }

    /// Layer the interceptors onto every route registered so far.
    ///
    /// Metrics is outermost. Tracing wraps logging so the access record can
    /// carry the span's trace and span ids.
    pub fn instrument<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router
            .layer(from_fn_with_state(self.logging.clone(), logging_middleware))
            .layer(from_fn_with_state(self.tracing.clone(), tracing_middleware))
            .layer(from_fn_with_state(self.metrics.clone(), metrics_middleware))
    }
}
