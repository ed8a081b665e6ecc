//! Distributed tracing middleware for HTTP requests
//!
//! This middleware extracts trace context from incoming HTTP headers and
//! starts a server span for each request. The span's context is inserted into
//! the request extensions and attached to the handler future, so both
//! downstream middleware and nested operations continue the same trace.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{FutureExt, SpanKind, TraceContextExt};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::propagation::TraceContextPropagator;

use super::HandlerErrors;
use crate::error::TelemetryError;
use crate::observability::attributes::HTTP_STATUS;
use crate::observability::exclusion::ExcludedPaths;
use crate::observability::tracing::{
    HTTP_ROUTE, HTTP_STATUS_DESCRIPTION, SpanStarter, extract_trace_context, span_name,
    span_status,
};

/// Shared state of [`tracing_middleware`].
pub struct HttpTracing {
    tracer: Arc<dyn SpanStarter>,
    propagator: Arc<dyn TextMapPropagator + Send + Sync>,
    excluded: Arc<ExcludedPaths>,
}

impl HttpTracing {
    /// Trace with `tracer`, reading W3C `traceparent`/`tracestate` headers.
    pub fn new(tracer: Arc<dyn SpanStarter>) -> Self {
        Self {
            tracer,
            propagator: Arc::new(TraceContextPropagator::new()),
            excluded: Arc::new(ExcludedPaths::none()),
        }
    }

    pub fn with_propagator(mut self, propagator: Arc<dyn TextMapPropagator + Send + Sync>) -> Self {
        self.propagator = propagator;
        self
    }

    pub fn with_excluded_paths(mut self, excluded: Arc<ExcludedPaths>) -> Self {
        self.excluded = excluded;
        self
    }
}

/// Middleware that extracts trace context from HTTP headers and creates spans
pub async fn tracing_middleware(
    State(state): State<Arc<HttpTracing>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if state.excluded.is_excluded(&path) {
        return next.run(req).await;
    }

    let parent = extract_trace_context(
        state.propagator.as_ref(),
        &Context::current(),
        req.headers(),
    );

    let name = span_name(req.method().as_str(), &path);
    let cx = state.tracer.start(
        &parent,
        name.clone(),
        SpanKind::Server,
        vec![KeyValue::new(HTTP_ROUTE, name)],
    );

    req.extensions_mut().insert(cx.clone());
    let response = next.run(req).with_context(cx.clone()).await;

    let status = response.status().as_u16();
    let outcome = span_status(status);
    let span = cx.span();

    span.set_attribute(KeyValue::new(HTTP_STATUS, i64::from(status)));
    if !outcome.description.is_empty() {
        span.set_attribute(KeyValue::new(HTTP_STATUS_DESCRIPTION, outcome.description));
    }
    if let Some(errors) = response.extensions().get::<HandlerErrors>() {
        for message in errors.messages() {
            span.record_error(&TelemetryError::RequestFailed(message.clone()));
        }
    }
    span.set_status(outcome.to_status());
    span.end();

    response
}
