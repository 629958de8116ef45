//! Telemetry error types.

use thiserror::Error;

/// Errors raised while installing logging or metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The Prometheus recorder could not be installed.
    #[error("metrics recorder install failed: {0}")]
    MetricsInit(String),

    /// The filter was invalid or a global subscriber already exists.
    #[error("log subscriber install failed: {0}")]
    LoggingInit(String),

    /// The metrics listener address did not parse.
    #[error("invalid metrics listener address {0}")]
    InvalidAddress(String),
}
