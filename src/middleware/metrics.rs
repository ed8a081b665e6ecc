//! Request metrics middleware
//!
//! Maintains three metrics per API, all written through an injected
//! [`metrics::Recorder`]:
//! - `<ns>_<api>_concurrent_calls` gauge, labelled by path and method
//! - `<ns>_<api>_total_calls` counter, labelled by path, method and status
//! - `<ns>_<api>_call_duration` histogram in milliseconds, same labels

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use metrics::{Gauge, Key, KeyName, Label, Level, Metadata, Recorder, SharedString, Unit};

use crate::error::{TelemetryError, TelemetryResult};
use crate::observability::exclusion::ExcludedPaths;
use crate::observability::recorder::{
    CALL_DURATION_HELP, CONCURRENT_CALLS_HELP, LABEL_METHOD, LABEL_PATH, LABEL_STATUS,
    MetricNames, TOTAL_CALLS_HELP,
};

static METADATA: Metadata<'static> = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

/// Shared state of [`metrics_middleware`].
pub struct HttpMetrics {
    recorder: Arc<dyn Recorder + Send + Sync>,
    names: MetricNames,
    excluded: Arc<ExcludedPaths>,
}

impl std::fmt::Debug for HttpMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMetrics")
            .field("names", &self.names)
            .field("excluded", &self.excluded)
            .finish_non_exhaustive()
    }
}

impl HttpMetrics {
    pub fn builder() -> HttpMetricsBuilder {
        HttpMetricsBuilder::default()
    }

    pub fn names(&self) -> &MetricNames {
        &self.names
    }

    fn in_flight(&self, path: &str, method: &str) -> InFlight {
        let key = Key::from_parts(
            self.names.concurrent_calls.clone(),
            vec![
                Label::new(LABEL_PATH, path.to_string()),
                Label::new(LABEL_METHOD, method.to_string()),
            ],
        );
        InFlight::enter(self.recorder.register_gauge(&key, &METADATA))
    }

    fn record(&self, path: &str, method: &str, status: u16, elapsed: Duration) {
        let labels = vec![
            Label::new(LABEL_PATH, path.to_string()),
            Label::new(LABEL_METHOD, method.to_string()),
            Label::new(LABEL_STATUS, status.to_string()),
        ];

        let duration = Key::from_parts(self.names.call_duration.clone(), labels.clone());
        self.recorder
            .register_histogram(&duration, &METADATA)
            .record(elapsed.as_secs_f64() * 1000.0);

        let total = Key::from_parts(self.names.total_calls.clone(), labels);
        self.recorder.register_counter(&total, &METADATA).increment(1);
    }
}

/// Builder for [`HttpMetrics`]. All of registry, namespace and api name are
/// required.
#[derive(Default)]
pub struct HttpMetricsBuilder {
    recorder: Option<Arc<dyn Recorder + Send + Sync>>,
    namespace: String,
    api_name: String,
    excluded: Arc<ExcludedPaths>,
}

impl HttpMetricsBuilder {
    pub fn registry(mut self, recorder: Arc<dyn Recorder + Send + Sync>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn api_name(mut self, api_name: impl Into<String>) -> Self {
        self.api_name = api_name.into();
        self
    }

    pub fn excluded_paths(mut self, excluded: Arc<ExcludedPaths>) -> Self {
        self.excluded = excluded;
        self
    }

    /// Validate the settings and describe the three metrics to the registry.
    pub fn build(self) -> TelemetryResult<HttpMetrics> {
        let recorder = self.recorder.ok_or(TelemetryError::MissingRegistry)?;
        if self.namespace.trim().is_empty() {
            return Err(TelemetryError::EmptyNamespace);
        }
        if self.api_name.trim().is_empty() {
            return Err(TelemetryError::EmptyApiName);
        }

        let names = MetricNames::new(&self.namespace, &self.api_name);

        recorder.describe_gauge(
            KeyName::from(names.concurrent_calls.clone()),
            Some(Unit::Count),
            SharedString::const_str(CONCURRENT_CALLS_HELP),
        );
        recorder.describe_counter(
            KeyName::from(names.total_calls.clone()),
            Some(Unit::Count),
            SharedString::const_str(TOTAL_CALLS_HELP),
        );
        recorder.describe_histogram(
            KeyName::from(names.call_duration.clone()),
            Some(Unit::Milliseconds),
            SharedString::const_str(CALL_DURATION_HELP),
        );

        tracing::debug!(
            concurrent_calls = %names.concurrent_calls,
            total_calls = %names.total_calls,
            call_duration = %names.call_duration,
            "HTTP metrics registered"
        );

        Ok(HttpMetrics {
            recorder,
            names,
            excluded: self.excluded,
        })
    }
}

/// Decrements the concurrency gauge when dropped, including when the request
/// future is cancelled.
struct InFlight(Gauge);

impl InFlight {
    fn enter(gauge: Gauge) -> Self {
        gauge.increment(1.0);
        Self(gauge)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.decrement(1.0);
    }
}

/// Middleware to record HTTP request metrics
pub async fn metrics_middleware(
    State(metrics): State<Arc<HttpMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if metrics.excluded.is_excluded(&path) {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let start = Instant::now();
    let in_flight = metrics.in_flight(&path, &method);

    let response = next.run(req).await;

    drop(in_flight);
    metrics.record(&path, &method, response.status().as_u16(), start.elapsed());

    response
}
