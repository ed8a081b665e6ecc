//! Distributed tracing support
//!
//! This module holds the pieces the tracing middleware is assembled from:
//! - [`SpanStarter`], the object-safe seam over any OpenTelemetry tracer
//! - W3C header extraction/injection for trace context propagation
//! - The fixed HTTP status to span outcome table
//! - Correlation identifiers for log records

use std::borrow::Cow;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};

pub const OTEL_TRACE_ID: &str = "otel.trace_id";
pub const OTEL_SPAN_ID: &str = "otel.span_id";
pub const HTTP_ROUTE: &str = "http.route";
pub const HTTP_STATUS_DESCRIPTION: &str = "http.response.status_description";

/// Starts spans on behalf of the tracing middleware.
///
/// Implemented for every OpenTelemetry [`Tracer`] whose spans can cross threads,
/// so both SDK tracers and `global::BoxedTracer` plug in directly.
pub trait SpanStarter: Send + Sync {
    /// Start a span as a child of `parent` and return a context carrying it.
    fn start(
        &self,
        parent: &Context,
        name: String,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
    ) -> Context;
}

impl<T> SpanStarter for T
where
    T: Tracer + Send + Sync,
    T::Span: Send + Sync + 'static,
{
    fn start(
        &self,
        parent: &Context,
        name: String,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
    ) -> Context {
        let span = self
            .span_builder(name)
            .with_kind(kind)
            .with_attributes(attributes)
            .start_with_context(self, parent);
        parent.with_span(span)
    }
}

/// Classification of a finished request on its span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeCode {
    Unset,
    Ok,
    Error,
}

/// Outcome code plus human description for an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanOutcome {
    pub code: OutcomeCode,
    pub description: &'static str,
}

impl SpanOutcome {
    const fn new(code: OutcomeCode, description: &'static str) -> Self {
        Self { code, description }
    }

    /// OpenTelemetry status for this outcome. `Status::Ok` carries no
    /// description, so callers record it separately.
    pub fn to_status(&self) -> Status {
        match self.code {
            OutcomeCode::Unset => Status::Unset,
            OutcomeCode::Ok => Status::Ok,
            OutcomeCode::Error => Status::Error {
                description: Cow::Borrowed(self.description),
            },
        }
    }
}

/// Map an HTTP status code to its span outcome.
///
/// Client errors (4xx) are an `Ok` outcome: the server handled them correctly.
/// Only the listed 5xx codes are errors; anything unlisted stays `Unset`.
pub fn span_status(status: u16) -> SpanOutcome {
    match status {
        200..=299 => SpanOutcome::new(OutcomeCode::Ok, "OK"),
        400 => SpanOutcome::new(OutcomeCode::Ok, "Bad Request"),
        401 => SpanOutcome::new(OutcomeCode::Ok, "Unauthorized"),
        403 => SpanOutcome::new(OutcomeCode::Ok, "Forbidden"),
        404 => SpanOutcome::new(OutcomeCode::Ok, "Not Found"),
        405 => SpanOutcome::new(OutcomeCode::Ok, "Method Not Allowed"),
        500 => SpanOutcome::new(OutcomeCode::Error, "Internal Server Error"),
        502 => SpanOutcome::new(OutcomeCode::Error, "Bad Gateway"),
        503 => SpanOutcome::new(OutcomeCode::Error, "Service Unavailable"),
        _ => SpanOutcome::new(OutcomeCode::Unset, ""),
    }
}

/// Span name and route attribute value, e.g. `GET: /orders`.
pub fn span_name(method: &str, path: &str) -> String {
    format!("{method}: {path}")
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect::<Vec<_>>()
    }
}

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let Ok(name) = HeaderName::from_bytes(key.as_bytes()) {
            if let Ok(val) = HeaderValue::from_str(&value) {
                self.0.insert(name, val);
            }
        }
    }
}

/// Extract an incoming trace context from HTTP headers.
///
/// Returns `parent` unchanged when the headers carry no context.
pub fn extract_trace_context(
    propagator: &dyn TextMapPropagator,
    parent: &Context,
    headers: &HeaderMap,
) -> Context {
    propagator.extract_with_context(parent, &HeaderExtractor(headers))
}

/// Inject a trace context into HTTP headers for an outgoing request.
pub fn inject_trace_context(
    propagator: &dyn TextMapPropagator,
    cx: &Context,
    headers: &mut HeaderMap,
) {
    propagator.inject_context(cx, &mut HeaderInjector(headers));
}

/// Hex trace and span identifiers of the span active in `cx`, if valid.
pub fn correlation_ids(cx: &Context) -> Option<(String, String)> {
    let span = cx.span();
    let span_context = span.span_context();

    if span_context.is_valid() {
        Some((
            format!("{:032x}", span_context.trace_id()),
            format!("{:016x}", span_context.span_id()),
        ))
    } else {
        None
    }
}
