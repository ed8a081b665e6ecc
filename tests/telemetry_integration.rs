use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use metrics_exporter_prometheus::PrometheusRecorder;
use opentelemetry::trace::{Status, TracerProvider as _};
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::testing::trace::InMemorySpanExporter;
use opentelemetry_sdk::trace::TracerProvider;
use tower::ServiceExt;

use http_telemetry::observability::attributes::HTTP_STATUS;
use http_telemetry::observability::tracing::{OTEL_SPAN_ID, OTEL_TRACE_ID};
use http_telemetry::{
    ExcludedPaths, HandlerErrors, HttpLogging, HttpMetrics, HttpTelemetry, HttpTracing, LogSink,
    RequestAttributes, SpanStarter, TelemetryError, prometheus_registry,
};

#[derive(Debug, Clone, PartialEq)]
enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone)]
struct Record {
    level: Level,
    error: Option<String>,
    attributes: RequestAttributes,
}

#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<Record>>,
}

impl RecordingSink {
    fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }
}

impl LogSink for RecordingSink {
    fn info(&self, _message: &str, attributes: &RequestAttributes) {
        self.records.lock().unwrap().push(Record {
            level: Level::Info,
            error: None,
            attributes: attributes.clone(),
        });
    }

    fn error(
        &self,
        error: &(dyn std::error::Error + 'static),
        _message: &str,
        attributes: &RequestAttributes,
    ) {
        self.records.lock().unwrap().push(Record {
            level: Level::Error,
            error: Some(error.to_string()),
            attributes: attributes.clone(),
        });
    }
}

struct Harness {
    app: Router,
    recorder: Arc<PrometheusRecorder>,
    provider: TracerProvider,
    exporter: InMemorySpanExporter,
    sink: Arc<RecordingSink>,
}

impl Harness {
    fn new(excluded: &[&str]) -> Result<Self> {
        let excluded = Arc::new(ExcludedPaths::new(excluded));

        let recorder = Arc::new(prometheus_registry("acme", "orders")?);
        let metrics = HttpMetrics::builder()
            .registry(recorder.clone())
            .namespace("acme")
            .api_name("orders")
            .excluded_paths(excluded.clone())
            .build()?;

        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let tracer: Arc<dyn SpanStarter> = Arc::new(provider.tracer("integration"));
        let tracing = HttpTracing::new(tracer).with_excluded_paths(excluded.clone());

        let sink = Arc::new(RecordingSink::default());
        let logging = HttpLogging::new(sink.clone()).with_excluded_paths(excluded);

        let telemetry = HttpTelemetry::new(metrics, tracing, logging);
        let app = telemetry.instrument(
            Router::new()
                .route("/orders", get(|| async { "ok" }))
                .route("/fail", get(fail))
                .route("/health", get(|| async { "healthy" }))
                .route("/other", get(|| async { "other" })),
        );

        Ok(Self {
            app,
            recorder,
            provider,
            exporter,
            sink,
        })
    }

    async fn get(&self, uri: &str) -> Result<StatusCode> {
        let request = Request::builder().uri(uri).body(Body::empty())?;
        Ok(self.app.clone().oneshot(request).await?.status())
    }

    fn spans(&self) -> Vec<SpanData> {
        let _ = self.provider.force_flush();
        self.exporter.get_finished_spans().unwrap_or_default()
    }

    fn rendered_metrics(&self) -> String {
        self.recorder.handle().render()
    }
}

async fn fail() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        HandlerErrors::from("db timeout"),
        "internal error",
    )
}

fn is_lower_hex(value: &str, len: usize) -> bool {
    value.len() == len
        && value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        && value.chars().any(|c| c != '0')
}

#[tokio::test]
async fn test_successful_request_is_correlated() -> Result<()> {
    let harness = Harness::new(&[])?;

    assert_eq!(harness.get("/orders").await?, StatusCode::OK);

    let records = harness.sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.level, Level::Info);
    assert_eq!(record.attributes.get(HTTP_STATUS).unwrap().to_string(), "200");

    let trace_id = record.attributes.get(OTEL_TRACE_ID).unwrap().to_string();
    let span_id = record.attributes.get(OTEL_SPAN_ID).unwrap().to_string();
    assert!(is_lower_hex(&trace_id, 32), "{trace_id}");
    assert!(is_lower_hex(&span_id, 16), "{span_id}");

    let spans = harness.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(format!("{:032x}", spans[0].span_context.trace_id()), trace_id);
    assert_eq!(format!("{:016x}", spans[0].span_context.span_id()), span_id);
    assert_eq!(spans[0].status, Status::Ok);

    assert!(harness.rendered_metrics().contains("acme_orders_total_calls"));
    Ok(())
}

#[tokio::test]
async fn test_failed_request_logs_error_and_marks_span() -> Result<()> {
    let harness = Harness::new(&[])?;

    assert_eq!(harness.get("/fail").await?, StatusCode::INTERNAL_SERVER_ERROR);

    let records = harness.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, Level::Error);
    assert_eq!(records[0].error.as_deref(), Some("db timeout"));

    let spans = harness.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].status, Status::error("Internal Server Error"));

    let rendered = harness.rendered_metrics();
    assert!(rendered.lines().any(|line| line.starts_with("acme_orders_total_calls")
        && line.contains("http_status=\"500\"")));
    Ok(())
}

#[tokio::test]
async fn test_excluded_path_is_skipped_by_every_interceptor() -> Result<()> {
    let harness = Harness::new(&["/health"])?;

    assert_eq!(harness.get("/health").await?, StatusCode::OK);

    assert!(harness.sink.records().is_empty());
    assert!(harness.spans().is_empty());
    assert!(!harness.rendered_metrics().contains("/health"));

    assert_eq!(harness.get("/other").await?, StatusCode::OK);

    assert_eq!(harness.sink.records().len(), 1);
    assert_eq!(harness.spans().len(), 1);
    assert!(harness.rendered_metrics().contains("http_path=\"/other\""));
    Ok(())
}

#[test]
fn test_metrics_construction_fails_fast() -> Result<()> {
    let registry = Arc::new(prometheus_registry("acme", "orders")?);

    let missing_registry = HttpMetrics::builder()
        .namespace("acme")
        .api_name("orders")
        .build();
    assert_eq!(missing_registry.unwrap_err(), TelemetryError::MissingRegistry);

    let empty_namespace = HttpMetrics::builder()
        .registry(registry.clone())
        .api_name("orders")
        .build();
    assert_eq!(empty_namespace.unwrap_err(), TelemetryError::EmptyNamespace);

    let empty_api_name = HttpMetrics::builder()
        .registry(registry)
        .namespace("acme")
        .build();
    assert_eq!(empty_api_name.unwrap_err(), TelemetryError::EmptyApiName);
    Ok(())
}
