pub mod types;

pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        assert_eq!(TelemetryError::MissingRegistry.to_string(), "metrics registry is missing");
        assert_eq!(TelemetryError::EmptyNamespace.to_string(), "namespace is empty");
        assert_eq!(TelemetryError::EmptyApiName.to_string(), "api name is empty");

        let err = TelemetryError::Config("format must be json or pretty".to_string());
        assert_eq!(err.to_string(), "Configuration error: format must be json or pretty");
    }

    #[test]
    fn test_request_failed_keeps_joined_message() {
        let err = TelemetryError::RequestFailed("db timeout;cache miss".to_string());
        assert_eq!(err.to_string(), "db timeout;cache miss");
    }

    #[test]
    fn test_log_assembly_mentions_panic() {
        let err = TelemetryError::LogAssembly("boom".to_string());
        assert_eq!(err.to_string(), "panic in logging middleware: boom");
    }
}
