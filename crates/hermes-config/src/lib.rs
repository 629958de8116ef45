//! Typed configuration for the Hermes middleware engine.
//!
//! This crate provides a strongly-typed configuration system with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! The configuration system is built around the [`HermesConfig`] struct:
//!
//! - [`MiddlewareConfig`] - Stage timeout and missing-arguments policy
//! - [`TelemetryConfigSection`] - Logging and metrics settings
//!
//! # Example
//!
//! ```no_run
//! use hermes_config::ConfigLoader;
//!
//! # fn main() -> Result<(), hermes_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("hermes.toml")?
//!     .with_env_prefix("HERMES")
//!     .load()?;
//!
//! println!("Stage timeout: {:?}", config.middleware.timeout());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [middleware]
//! timeout_secs = 60
//! missing_arguments = "empty"
//!
//! [telemetry]
//! service_name = "arena"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//!
//! [telemetry.logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden via environment variables using the format
//! `PREFIX__SECTION__KEY`. For example:
//!
//! - `HERMES__MIDDLEWARE__TIMEOUT_SECS=10`
//! - `HERMES__MIDDLEWARE__MISSING_ARGUMENTS=preserve`
//! - `HERMES__TELEMETRY__LOGGING__FORMAT=pretty`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HermesConfig::default();
        assert_eq!(config.middleware.timeout_secs, 60);
        assert_eq!(config.telemetry.metrics.addr, "0.0.0.0:9090");
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = HermesConfig::development();
        let text = toml::to_string(&config).unwrap();
        let parsed: HermesConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
