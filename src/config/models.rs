use garde::Validate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TelemetryConfig {
    /// Metric name prefix, e.g. `acme`.
    #[garde(length(min = 1))]
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Logical API name folded into every metric name.
    #[garde(length(min = 1))]
    #[serde(default = "default_api_name")]
    pub api_name: String,

    #[garde(skip)]
    #[serde(default)]
    pub excluded_paths: Vec<String>,

    #[garde(dive)]
    #[serde(default)]
    pub service: ServiceConfig,

    #[garde(dive)]
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_namespace() -> String {
    "http".to_string()
}

fn default_api_name() -> String {
    "api".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            api_name: default_api_name(),
            excluded_paths: Vec::new(),
            service: ServiceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Identity stamped on every access log record.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ServiceConfig {
    #[garde(length(min = 1))]
    #[serde(default = "default_service_name")]
    pub name: String,

    #[garde(length(min = 1))]
    #[serde(default = "default_service_version")]
    pub version: String,

    #[garde(length(min = 1))]
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_service_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            version: default_service_version(),
            environment: default_environment(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LoggingConfig {
    #[garde(length(min = 1))]
    #[serde(default = "default_log_level")]
    pub level: String, // trace, debug, info, warn, error

    #[garde(pattern(r"^(json|pretty)$"))]
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
