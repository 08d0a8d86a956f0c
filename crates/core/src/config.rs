use crate::error::{ExperimentError, ExperimentResult};
use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CARTBOOST__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Raw events older than this are purged by the retention sweep.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_range")]
    pub default_range: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_test_name")]
    pub test_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

// Default functions
fn default_retention_days() -> u32 {
    90
}
fn default_range() -> String {
    "last7".to_string()
}
fn default_test_name() -> String {
    "Initial Free Shipping Bar Test".to_string()
}
fn default_log_filter() -> String {
    "cartboost=info".to_string()
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            default_range: default_range(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            test_name: default_test_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: default_log_filter(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig::default(),
            reporting: ReportingConfig::default(),
            bootstrap: BootstrapConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> ExperimentResult<Self> {
        Self::from_builder(
            config::Config::builder().add_source(
                config::Environment::with_prefix("CARTBOOST")
                    .separator("__")
                    .try_parsing(true),
            ),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> ExperimentResult<Self> {
        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| ExperimentError::Config(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.tracking.retention_days, 90);
        assert_eq!(config.reporting.default_range, "last7");
        assert_eq!(config.bootstrap.test_name, "Initial Free Shipping Bar Test");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_partial_source_fills_defaults() {
        let builder = config::Config::builder()
            .set_override("tracking.retention_days", 30)
            .unwrap();
        let config = AppConfig::from_builder(builder).unwrap();
        assert_eq!(config.tracking.retention_days, 30);
        assert_eq!(config.reporting.default_range, "last7");
    }

    #[test]
    fn test_bad_value_maps_to_config_error() {
        let builder = config::Config::builder()
            .set_override("tracking.retention_days", "ninety")
            .unwrap();
        let err = AppConfig::from_builder(builder).unwrap_err();
        assert!(matches!(err, ExperimentError::Config(_)));
    }
}
