use std::path::Path;

use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use garde::Validate;

use super::TelemetryConfig;
use crate::error::TelemetryError;

pub const ENV_PREFIX: &str = "TELEMETRY_";

/// Layered configuration: embedded defaults, then the TOML file if one is
/// given, then `TELEMETRY_*` environment variables (`__` separates sections).
pub fn figment(path: Option<&Path>) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(TelemetryConfig::default()));

    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }

    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load and validate configuration.
pub fn load_config(path: Option<&Path>) -> Result<TelemetryConfig> {
    let config: TelemetryConfig = figment(path).extract()?;

    config.validate().map_err(TelemetryError::from)?;

    tracing::debug!(
        namespace = %config.namespace,
        api_name = %config.api_name,
        excluded = config.excluded_paths.len(),
        "Telemetry configuration loaded"
    );

    Ok(config)
}
