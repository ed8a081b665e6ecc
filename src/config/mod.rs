pub mod models;
pub mod validation;

pub use models::*;
pub use validation::*;

#[cfg(test)]
mod tests {
    use super::*;
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };
    use garde::Validate;
    use std::path::Path;

    #[test]
    fn test_valid_config_loads() {
        let config_toml = r#"
            namespace = "acme"
            api_name = "orders"
            excluded_paths = ["/health", "/ready"]

            [service]
            name = "orders-api"
            version = "2.0.0"
            environment = "staging"

            [logging]
            level = "debug"
            format = "pretty"
        "#;

        let config: TelemetryConfig = Figment::new()
            .merge(Toml::string(config_toml))
            .extract()
            .expect("Should parse valid config");

        assert!(config.validate().is_ok());
        assert_eq!(config.namespace, "acme");
        assert_eq!(config.api_name, "orders");
        assert_eq!(config.excluded_paths, vec!["/health", "/ready"]);
        assert_eq!(config.service.name, "orders-api");
        assert_eq!(config.service.environment, "staging");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let config: TelemetryConfig = Figment::new()
            .merge(Toml::string(r#"namespace = """#))
            .extract()
            .expect("Should parse");

        let validation = config.validate();
        assert!(validation.is_err());
        assert!(validation.unwrap_err().to_string().contains("namespace"));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let config_toml = r#"
            [logging]
            format = "xml"
        "#;

        let config: TelemetryConfig = Figment::new()
            .merge(Toml::string(config_toml))
            .extract()
            .expect("Should parse");

        let validation = config.validate();
        assert!(validation.is_err());
        assert!(validation.unwrap_err().to_string().contains("format"));
    }

    #[test]
    fn test_default_values() {
        let config: TelemetryConfig = Figment::new()
            .merge(Serialized::defaults(TelemetryConfig::default()))
            .extract()
            .expect("Should load defaults");

        assert!(config.validate().is_ok());
        assert!(!config.namespace.is_empty());
        assert!(!config.api_name.is_empty());
        assert!(config.excluded_paths.is_empty());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_config_from_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "telemetry.toml",
                r#"
                namespace = "shop"
                api_name = "cart"
                excluded_paths = ["/metrics"]
                "#,
            )?;

            let config = load_config(Some(Path::new("telemetry.toml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.namespace, "shop");
            assert_eq!(config.api_name, "cart");
            assert_eq!(config.excluded_paths, vec!["/metrics"]);
            assert_eq!(config.logging.format, "json");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "telemetry.toml",
                r#"
                namespace = "shop"
                api_name = "cart"
                "#,
            )?;
            jail.set_env("TELEMETRY_API_NAME", "checkout");
            jail.set_env("TELEMETRY_LOGGING__LEVEL", "warn");

            let config = load_config(Some(Path::new("telemetry.toml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.namespace, "shop");
            assert_eq!(config.api_name, "checkout");
            assert_eq!(config.logging.level, "warn");
            Ok(())
        });
    }

    #[test]
    fn test_load_config_rejects_invalid_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("telemetry.toml", r#"api_name = """#)?;

            assert!(load_config(Some(Path::new("telemetry.toml"))).is_err());
            Ok(())
        });
    }
}
