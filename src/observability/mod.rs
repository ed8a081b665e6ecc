//! Building blocks shared by the telemetry middleware
//!
//! - Attribute extraction from a request/response pair
//! - Metric and user agent naming rules
//! - Path exclusion
//! - OpenTelemetry span helpers and the [`LogSink`] seam

pub mod attributes;
pub mod exclusion;
pub mod logging;
pub mod naming;
pub mod recorder;
pub mod tracing;
pub mod user_agent;

pub use attributes::{
    AttributeValue, RequestAttributes, RequestInfo, ResponseInfo, TlsInfo, extract_attributes,
    parse_headers,
};
pub use exclusion::ExcludedPaths;
pub use logging::{ACCESS_LOG_TARGET, LogSink, TracingLogSink, init_logging};
pub use naming::normalize;
pub use recorder::{MetricNames, call_duration_buckets, prometheus_registry};
pub use tracing::{
    OutcomeCode, SpanOutcome, SpanStarter, correlation_ids, extract_trace_context,
    inject_trace_context, span_status,
};
pub use user_agent::{Browser, Device, classify_user_agent, parse_user_agent};
