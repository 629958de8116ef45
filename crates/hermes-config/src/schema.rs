//! Configuration schema types.
//!
//! This module defines the structure of every configuration section.

use hermes_core::MissingArguments;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Middleware engine configuration section.
///
/// # Example
///
/// ```
/// use hermes_config::MiddlewareConfig;
/// use hermes_core::MissingArguments;
///
/// let config = MiddlewareConfig {
///     timeout_secs: 5,
///     missing_arguments: MissingArguments::Preserve,
/// };
/// assert_eq!(config.timeout().as_secs(), 5);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MiddlewareConfig {
    /// Hard timeout for every stage invocation, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// What the next stage receives when a stage accepts without arguments.
    #[serde(default)]
    pub missing_arguments: MissingArguments,
}

impl MiddlewareConfig {
    /// Returns the stage timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            missing_arguments: MissingArguments::default(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    60
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus listener address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level or `EnvFilter` directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telemetry configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfigSection {
    /// Service name attached to the startup log line.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfigSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "hermes".to_string()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middleware_config_default() {
        let config = MiddlewareConfig::default();
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.missing_arguments, MissingArguments::Empty);
    }

    #[test]
    fn test_middleware_config_deserialize() {
        let toml = r#"
            timeout_secs = 10
            missing_arguments = "preserve"
        "#;
        let config: MiddlewareConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.missing_arguments, MissingArguments::Preserve);
    }

    #[test]
    fn test_middleware_config_unknown_field() {
        let toml = r"
            timeout = 10
        ";
        let result: Result<MiddlewareConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_metrics_config_default() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
    }

    #[test]
    fn test_log_format_serde() {
        let json = serde_json::to_string(&LogFormat::Pretty).unwrap();
        assert_eq!(json, "\"pretty\"");
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.ansi_enabled);
    }

    #[test]
    fn test_telemetry_section_partial() {
        let toml = r#"
            service_name = "arena"

            [logging]
            format = "pretty"
        "#;
        let config: TelemetryConfigSection = toml::from_str(toml).unwrap();
        assert_eq!(config.service_name, "arena");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.level, "info");
        assert!(!config.metrics.enabled);
    }
}
