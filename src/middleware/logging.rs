//! Access logging middleware
//!
//! Emits exactly one record per instrumented request through a [`LogSink`].
//! Failures while assembling or emitting the record are contained here and
//! never reach the request path.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::TelemetryError;
use crate::observability::attributes::{
    RequestAttributes, RequestInfo, ResponseInfo, extract_attributes,
};
use crate::observability::exclusion::ExcludedPaths;
use crate::observability::logging::LogSink;
use crate::observability::tracing::{OTEL_SPAN_ID, OTEL_TRACE_ID, correlation_ids};

pub const REQUEST_SUCCESSFUL: &str = "request successful";
pub const REQUEST_FAILED: &str = "request failed";
pub const LOGGING_PANIC: &str = "panic in logging middleware";
pub const LOGGING_PANIC_VALUE: &str = "http.logging.panic";

/// Shared state of [`logging_middleware`].
pub struct HttpLogging {
    sink: Arc<dyn LogSink>,
    excluded: Arc<ExcludedPaths>,
}

impl HttpLogging {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            excluded: Arc::new(ExcludedPaths::none()),
        }
    }

    pub fn with_excluded_paths(mut self, excluded: Arc<ExcludedPaths>) -> Self {
        self.excluded = excluded;
        self
    }

    /// Emit the record for a finished request.
    ///
    /// A panic raised while building or writing the record is reported as a
    /// secondary error record carrying the panic value under
    /// [`LOGGING_PANIC_VALUE`].
    pub fn log_request(&self, request: &RequestInfo, response: &ResponseInfo) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.emit(request, response)));

        if let Err(payload) = outcome {
            let message = panic_message(payload.as_ref());
            let mut attributes = RequestAttributes::new();
            attributes.insert(LOGGING_PANIC_VALUE, message.as_str());

            let fallback = panic::catch_unwind(AssertUnwindSafe(|| {
                self.sink.error(
                    &TelemetryError::LogAssembly(message.clone()),
                    LOGGING_PANIC,
                    &attributes,
                )
            }));
            if fallback.is_err() {
                tracing::warn!(panic = %message, "log sink panicked while reporting a panic");
            }
        }
    }

    fn emit(&self, request: &RequestInfo, response: &ResponseInfo) {
        let mut attributes = extract_attributes(request, response);

        if let Some((trace_id, span_id)) = request.context.as_ref().and_then(correlation_ids) {
            attributes.insert(OTEL_TRACE_ID, trace_id);
            attributes.insert(OTEL_SPAN_ID, span_id);
        }

        if response.is_failure() {
            let error = TelemetryError::RequestFailed(failure_message(response));
            self.sink.error(&error, REQUEST_FAILED, &attributes);
        } else {
            self.sink.info(REQUEST_SUCCESSFUL, &attributes);
        }
    }
}

fn failure_message(response: &ResponseInfo) -> String {
    if response.errors.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        response.errors.join(";")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Middleware that logs every request once it has completed
pub async fn logging_middleware(
    State(logging): State<Arc<HttpLogging>>,
    req: Request,
    next: Next,
) -> Response {
    if logging.excluded.is_excluded(req.uri().path()) {
        return next.run(req).await;
    }

    let request = RequestInfo::from_request(&req);
    let start = Instant::now();

    let response = next.run(req).await;

    let info = ResponseInfo::from_response(&response, start.elapsed());
    logging.log_request(&request, &info);

    response
}
