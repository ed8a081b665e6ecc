//! Metric naming and the Prometheus recorder collaborator
//!
//! The metrics middleware writes through any [`metrics::Recorder`]. This module
//! fixes the metric names and help texts, and builds a Prometheus recorder with
//! the duration buckets applied. The recorder is never installed globally; the
//! application owns it and decides how to expose its rendered output.

use anyhow::{Result, anyhow};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusRecorder};

use super::naming::normalize;

pub const CONCURRENT_CALLS_SUFFIX: &str = "_concurrent_calls";
pub const TOTAL_CALLS_SUFFIX: &str = "_total_calls";
pub const CALL_DURATION_SUFFIX: &str = "_call_duration";

pub const CONCURRENT_CALLS_HELP: &str =
    "the count of concurrent calls to the APIs, grouped by path and http method";
pub const TOTAL_CALLS_HELP: &str =
    "The count of all call to the API, grouped by path, http method, and status code";
pub const CALL_DURATION_HELP: &str =
    "The duration in milliseconds calls to the API, grouped by path, http method, and status code";

pub const LABEL_PATH: &str = "http_path";
pub const LABEL_METHOD: &str = "http_method";
pub const LABEL_STATUS: &str = "http_status";

/// Fully qualified names of the three request metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricNames {
    pub concurrent_calls: String,
    pub total_calls: String,
    pub call_duration: String,
}

impl MetricNames {
    /// `<namespace>_<normalize(api_name + suffix)>` for each metric.
    pub fn new(namespace: &str, api_name: &str) -> Self {
        let name = |suffix: &str| format!("{namespace}_{}", normalize(&format!("{api_name}{suffix}")));

        Self {
            concurrent_calls: name(CONCURRENT_CALLS_SUFFIX),
            total_calls: name(TOTAL_CALLS_SUFFIX),
            call_duration: name(CALL_DURATION_SUFFIX),
        }
    }
}

/// Exponential series starting at 0.1ms, factor 1.5, five buckets.
pub fn call_duration_buckets() -> Vec<f64> {
    exponential_buckets(0.1, 1.5, 5)
}

fn exponential_buckets(start: f64, factor: f64, count: usize) -> Vec<f64> {
    std::iter::successors(Some(start), |bucket| Some(bucket * factor))
        .take(count)
        .collect()
}

/// Build a standalone Prometheus recorder for the given metric namespace.
///
/// The call duration metric is rendered as a histogram using
/// [`call_duration_buckets`]; everything else keeps the exporter defaults.
pub fn prometheus_registry(namespace: &str, api_name: &str) -> Result<PrometheusRecorder> {
    let names = MetricNames::new(namespace, api_name);

    let recorder = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(names.call_duration.clone()), &call_duration_buckets())
        .map_err(|e| anyhow!("Failed to configure duration buckets: {}", e))?
        .build_recorder();

    tracing::debug!(
        duration_metric = %names.call_duration,
        "Prometheus recorder built"
    );

    Ok(recorder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        let names = MetricNames::new("acme", "Orders API");

        assert_eq!(names.concurrent_calls, "acme_orders_api_concurrent_calls");
        assert_eq!(names.total_calls, "acme_orders_api_total_calls");
        assert_eq!(names.call_duration, "acme_orders_api_call_duration");
    }

    #[test]
    fn test_metric_names_normalize_separators() {
        let names = MetricNames::new("ns", "billing.v2/api");
        assert_eq!(names.total_calls, "ns_billing_v2_api_total_calls");
    }

    #[test]
    fn test_call_duration_buckets() {
        let expected = [0.1, 0.15, 0.225, 0.3375, 0.50625];
        let buckets = call_duration_buckets();

        assert_eq!(buckets.len(), expected.len());
        for (bucket, expected) in buckets.iter().zip(expected) {
            assert!((bucket - expected).abs() < 1e-9, "{bucket} != {expected}");
        }
    }

    #[test]
    fn test_prometheus_registry_renders_histogram() {
        use metrics::{Key, Label, Level, Metadata, Recorder};

        let recorder = prometheus_registry("acme", "orders").expect("recorder");
        let handle = recorder.handle();

        let key = Key::from_parts(
            "acme_orders_call_duration",
            vec![Label::new(LABEL_PATH, "/orders")],
        );
        let metadata = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));
        recorder.register_histogram(&key, &metadata).record(0.2);

        let rendered = handle.render();
        assert!(rendered.contains("acme_orders_call_duration_bucket"));
        assert!(rendered.contains("le=\"0.1\""));
    }
}
