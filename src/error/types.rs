use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("metrics registry is missing")]
    MissingRegistry,

    #[error("namespace is empty")]
    EmptyNamespace,

    #[error("api name is empty")]
    EmptyApiName,

    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors recorded by the downstream handler, joined with `;`
    #[error("{0}")]
    RequestFailed(String),

    #[error("panic in logging middleware: {0}")]
    LogAssembly(String),
}

pub type TelemetryResult<T> = std::result::Result<T, TelemetryError>;

impl From<garde::Report> for TelemetryError {
    fn from(report: garde::Report) -> Self {
        TelemetryError::Config(report.to_string())
    }
}
