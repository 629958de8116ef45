//! Prometheus metrics for the middleware engine.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hermes_middleware_stages_total` | Counter | `target`, `stage`, `direction`, `outcome` | Settled stage invocations |
//! | `hermes_middleware_stage_duration_seconds` | Histogram | `target`, `stage` | Time from invocation to settlement |
//! | `hermes_middleware_chains_total` | Counter | `target`, `direction`, `outcome` | Completed chains |
//! | `hermes_in_flight_chains` | Gauge | - | Chains currently executing |
//!
//! Recording functions are safe to call before [`init_metrics`]; the
//! `metrics` facade discards samples until a recorder is installed.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Initializes the metrics subsystem and its Prometheus HTTP listener.
///
/// Inside a tokio runtime the exporter runs as a task on that runtime;
/// otherwise it gets a dedicated thread with its own current-thread runtime.
/// The listener socket is bound before this function returns.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address, or
/// `TelemetryError::MetricsInit` if the listener cannot be bound or a
/// recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let builder = PrometheusBuilder::new().with_http_listener(addr);

    let handle = match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            let (recorder, exporter) = {
                let _entered = runtime.enter();
                builder
                    .build()
                    .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
            };
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

            runtime.spawn(async move {
                if exporter.await.is_err() {
                    tracing::error!(%addr, "prometheus exporter stopped");
                }
            });
            handle
        }
        Err(_) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            let (recorder, exporter) = {
                let _entered = runtime.enter();
                builder
                    .build()
                    .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
            };
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

            std::thread::Builder::new()
                .name("hermes-metrics".to_string())
                .spawn(move || {
                    if runtime.block_on(exporter).is_err() {
                        tracing::error!(%addr, "prometheus exporter stopped");
                    }
                })
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            handle
        }
    };

    let _ = METRICS_HANDLE.set(handle);

    register_metric_descriptions();

    tracing::info!(%addr, "prometheus exporter listening");

    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        "hermes_middleware_stages_total",
        "Middleware stage invocations by outcome"
    );
    describe_histogram!(
        "hermes_middleware_stage_duration_seconds",
        "Time from stage invocation to settlement in seconds"
    );
    describe_counter!(
        "hermes_middleware_chains_total",
        "Completed middleware chains by outcome"
    );
    describe_gauge!(
        "hermes_in_flight_chains",
        "Middleware chains currently executing"
    );
}

/// Records one settled stage invocation.
///
/// # Arguments
///
/// * `target` - Diagnostic label of the target
/// * `stage` - Stage label
/// * `direction` - "send" or "recv"
/// * `outcome` - "accepted", "rejected", "timed_out", ...
/// * `duration` - Time until settlement
pub fn record_stage(target: &str, stage: &str, direction: &str, outcome: &str, duration: Duration) {
    counter!(
        "hermes_middleware_stages_total",
        "target" => target.to_string(),
        "stage" => stage.to_string(),
        "direction" => direction.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        "hermes_middleware_stage_duration_seconds",
        "target" => target.to_string(),
        "stage" => stage.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a completed chain.
pub fn record_chain(target: &str, direction: &str, outcome: &str) {
    counter!(
        "hermes_middleware_chains_total",
        "target" => target.to_string(),
        "direction" => direction.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Guard that tracks a chain in the in-flight gauge until dropped.
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!("hermes_in_flight_chains").increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("hermes_in_flight_chains").decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
    }

    #[test]
    fn test_disabled_metrics_is_noop() {
        assert!(init_metrics(&MetricsConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not-an-address".to_string(),
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_exporter_serves_scrapes() {
        let config = MetricsConfig {
            enabled: true,
            addr: "127.0.0.1:39187".to_string(),
        };
        init_metrics(&config).unwrap();

        record_chain("Function 'Ping'", "recv", "accepted");
        let rendered = render_metrics().unwrap();
        assert!(rendered.contains("hermes_middleware_chains_total"));

        let mut stream = tokio::net::TcpStream::connect("127.0.0.1:39187").await.unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("hermes_middleware_chains_total"));
    }

    #[test]
    fn test_record_functions_dont_panic() {
        record_stage("Event 'Hit'", "log", "recv", "accepted", Duration::from_millis(3));
        record_chain("Event 'Hit'", "recv", "accepted");
        let guard = InFlightGuard::new();
        drop(guard);
    }
}
