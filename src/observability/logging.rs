//! Structured logging sink and subscriber setup
//!
//! The logging middleware hands each finished request to a [`LogSink`]. The
//! default [`TracingLogSink`] turns the record into a `tracing` event, so
//! whatever subscriber the application installs (see [`init_logging`])
//! decides where it ends up.
//!
//! Events are emitted with target [`ACCESS_LOG_TARGET`]. The attribute bag is
//! rendered as one JSON object field because `tracing` field names are static
//! while header-derived keys are not.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use super::attributes::{HTTP_METHOD, HTTP_PATH, HTTP_STATUS, RequestAttributes};
use super::tracing::{OTEL_SPAN_ID, OTEL_TRACE_ID};
use crate::config::{LoggingConfig, ServiceConfig};

pub const ACCESS_LOG_TARGET: &str = "http_telemetry::access";

/// Destination for per-request log records.
pub trait LogSink: Send + Sync {
    fn info(&self, message: &str, attributes: &RequestAttributes);

    fn error(
        &self,
        error: &(dyn std::error::Error + 'static),
        message: &str,
        attributes: &RequestAttributes,
    );
}

/// [`LogSink`] that emits `tracing` events tagged with the service identity.
#[derive(Debug, Clone)]
pub struct TracingLogSink {
    service: String,
    version: String,
    environment: String,
}

impl TracingLogSink {
    pub fn new(
        service: impl Into<String>,
        version: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            environment: environment.into(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(&config.name, &config.version, &config.environment)
    }
}

impl Default for TracingLogSink {
    fn default() -> Self {
        Self::new(
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            "development",
        )
    }
}

fn field(attributes: &RequestAttributes, key: &str) -> String {
    attributes
        .get(key)
        .map(|value| value.to_string())
        .unwrap_or_default()
}

impl LogSink for TracingLogSink {
    fn info(&self, message: &str, attributes: &RequestAttributes) {
        tracing::info!(
            target: ACCESS_LOG_TARGET,
            service = %self.service,
            version = %self.version,
            environment = %self.environment,
            http.method = %field(attributes, HTTP_METHOD),
            http.path = %field(attributes, HTTP_PATH),
            http.status = %field(attributes, HTTP_STATUS),
            otel.trace_id = %field(attributes, OTEL_TRACE_ID),
            otel.span_id = %field(attributes, OTEL_SPAN_ID),
            attributes = %attributes,
            "{message}"
        );
    }

    fn error(
        &self,
        error: &(dyn std::error::Error + 'static),
        message: &str,
        attributes: &RequestAttributes,
    ) {
        tracing::error!(
            target: ACCESS_LOG_TARGET,
            service = %self.service,
            version = %self.version,
            environment = %self.environment,
            http.method = %field(attributes, HTTP_METHOD),
            http.path = %field(attributes, HTTP_PATH),
            http.status = %field(attributes, HTTP_STATUS),
            otel.trace_id = %field(attributes, OTEL_TRACE_ID),
            otel.span_id = %field(attributes, OTEL_SPAN_ID),
            error = %error,
            attributes = %attributes,
            "{message}"
        );
    }
}

/// Install the global `tracing` subscriber.
///
/// Supports two formats:
/// - "json": structured output for production
/// - "pretty": human-readable output for development
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_level(true)
                .with_file(false)
                .with_line_number(false);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .try_init()?;
        }
        "pretty" => {
            let pretty_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_names(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(pretty_layer)
                .try_init()?;
        }
        _ => {
            return Err(anyhow::anyhow!(
                "Unsupported log format: {}. Use 'json' or 'pretty'",
                config.format
            ));
        }
    }

    tracing::debug!(
        level = %config.level,
        format = %config.format,
        "Structured logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TelemetryError;
    use tracing_test::traced_test;

    fn sample_attributes() -> RequestAttributes {
        let mut attributes = RequestAttributes::new();
        attributes.insert(HTTP_METHOD, "GET");
        attributes.insert(HTTP_PATH, "/orders");
        attributes.insert(HTTP_STATUS, 200_u16);
        attributes.insert("http.accept", "application/json");
        attributes
    }

    #[traced_test]
    #[test]
    fn test_info_record_carries_service_identity() {
        let sink = TracingLogSink::new("orders", "1.2.3", "test");
        sink.info("request successful", &sample_attributes());

        assert!(logs_contain("request successful"));
        assert!(logs_contain("service=orders"));
        assert!(logs_contain("version=1.2.3"));
        assert!(logs_contain("environment=test"));
        assert!(logs_contain("http.path=/orders"));
        assert!(logs_contain("http.accept"));
    }

    #[traced_test]
    #[test]
    fn test_error_record_includes_error() {
        let sink = TracingLogSink::default();
        let err = TelemetryError::RequestFailed("db timeout".to_string());
        sink.error(&err, "request failed", &sample_attributes());

        assert!(logs_contain("ERROR"));
        assert!(logs_contain("request failed"));
        assert!(logs_contain("db timeout"));
    }

    #[test]
    fn test_invalid_format_is_rejected() {
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "invalid".to_string(),
        };

        let result = init_logging(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Unsupported log format"));
    }
}
