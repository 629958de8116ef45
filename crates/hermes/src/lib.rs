//! # Hermes
//!
//! **Middleware engine for remote calls**
//!
//! Hermes runs an ordered chain of middleware stages over every remote call,
//! once before the transport sends it and once before it is delivered:
//!
//! - 🔗 **Ordered chains** – Target stages first, then namespace-wide stages, deduplicated
//! - ⏱️ **Bounded stages** – Every stage settles exactly once or times out
//! - 🔁 **Return transforms** – Stages can post-process the value that comes back
//! - 📊 **Observability** – Structured `tracing` logs and Prometheus metrics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hermes::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("hermes.toml")?
//!         .with_env_prefix("HERMES")
//!         .load()?;
//!
//!     let hermes = Hermes::from_config(config, ExecutionContext::delivery())?;
//!
//!     let ns = Namespace::builder("combat")
//!         .global(LoggingMiddleware::new().into_stage())
//!         .target(RemoteTarget::function("Ping"))
//!         .build()?;
//!
//!     let reply = hermes
//!         .receiver()
//!         .resolve_inbound(ns.target("Ping").unwrap(), raw, |_caller, args| async move {
//!             args[0].clone()
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! caller → [Send chain] → transport → [Recv chain] → handler
//!                                                       ↓
//! caller ← send transforms ← transport ← recv transforms
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use hermes_config::{HermesConfig, LogFormat};
use hermes_core::ExecutionContext;
use hermes_middleware::{ChainConfig, ReceiverAdapter, SenderAdapter};
use hermes_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};
use thiserror::Error;

// Re-export core types
pub use hermes_core as core;

// Re-export the middleware engine
pub use hermes_middleware as middleware;

// Re-export telemetry
pub use hermes_telemetry as telemetry;

// Re-export configuration
pub use hermes_config as config;

/// Errors raised while bootstrapping Hermes.
#[derive(Debug, Error)]
pub enum HermesError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] hermes_config::ConfigError),

    /// Logging or metrics could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] hermes_telemetry::TelemetryError),
}

/// A configured engine instance: hands out adapters that share one set of
/// chain settings and one execution context.
#[derive(Debug, Clone)]
pub struct Hermes {
    config: HermesConfig,
    context: ExecutionContext,
    chain: ChainConfig,
}

impl Hermes {
    /// Creates an instance without touching global telemetry state.
    #[must_use]
    pub fn new(config: HermesConfig, context: ExecutionContext) -> Self {
        let chain = chain_config(&config);
        Self {
            config,
            context,
            chain,
        }
    }

    /// Validates the configuration, installs logging and metrics, and
    /// creates an instance.
    ///
    /// # Errors
    ///
    /// Returns [`HermesError::Config`] for an invalid configuration and
    /// [`HermesError::Telemetry`] if a global subscriber or recorder is
    /// already installed.
    pub fn from_config(
        config: HermesConfig,
        context: ExecutionContext,
    ) -> Result<Self, HermesError> {
        config.validate()?;
        hermes_telemetry::init_telemetry(&telemetry_config(&config))?;

        tracing::info!(
            timeout_secs = config.middleware.timeout_secs,
            missing_arguments = ?config.middleware.missing_arguments,
            side = ?context.side(),
            "hermes initialized"
        );

        Ok(Self::new(config, context))
    }

    /// Returns the configuration this instance was built from.
    #[must_use]
    pub const fn config(&self) -> &HermesConfig {
        &self.config
    }

    /// Returns the execution context adapters are created with.
    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Returns the chain settings derived from the configuration.
    #[must_use]
    pub const fn chain_config(&self) -> ChainConfig {
        self.chain
    }

    /// Creates a sender adapter.
    #[must_use]
    pub fn sender(&self) -> SenderAdapter {
        SenderAdapter::with_config(self.context.clone(), self.chain)
    }

    /// Creates a receiver adapter.
    #[must_use]
    pub fn receiver(&self) -> ReceiverAdapter {
        ReceiverAdapter::with_config(self.context.clone(), self.chain)
    }
}

/// Maps the middleware section onto executor settings.
#[must_use]
pub fn chain_config(config: &HermesConfig) -> ChainConfig {
    ChainConfig::default()
        .with_timeout(config.middleware.timeout())
        .with_missing_arguments(config.middleware.missing_arguments)
}

/// Maps the telemetry section onto the telemetry crate's settings.
#[must_use]
pub fn telemetry_config(config: &HermesConfig) -> TelemetryConfig {
    let section = &config.telemetry;
    let logging = &section.logging;
    let pretty = logging.format == LogFormat::Pretty;

    TelemetryConfig {
        service_name: section.service_name.clone(),
        logging: LogConfig {
            enabled: logging.enabled,
            level: logging.level.clone(),
            json_format: !pretty,
            ansi: logging.ansi_enabled,
            span_events: pretty,
            file_line_info: logging.include_location,
            include_target: true,
        },
        metrics: MetricsConfig {
            enabled: section.metrics.enabled,
            addr: section.metrics.addr.clone(),
        },
    }
}

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use hermes::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Hermes, HermesError};

    pub use hermes_core::{
        Args, CallerIdentity, Direction, ExecutionContext, MissingArguments, Rejection,
        ReturnTransform, Side, Value, ValueKind,
    };

    pub use hermes_middleware::{
        Acceptance, ChainConfig, MiddlewareStage, Namespace, Outbound, ReceiverAdapter,
        RemoteTarget, SenderAdapter, StageCall,
    };

    // Built-in stages
    pub use hermes_middleware::stages::{
        LoggingMiddleware, RateLimitMiddleware, TypeCheckMiddleware,
    };

    pub use hermes_config::{ConfigLoader, HermesConfig};
}
