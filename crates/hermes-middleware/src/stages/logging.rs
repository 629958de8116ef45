//! Call logging stage.
//!
//! Logs every call in both directions and, for function targets, the value
//! that comes back. Never rejects and never changes arguments.
//!
//! Usually declared once as a global stage:
//!
//! ```ignore
//! let ns = Namespace::builder("combat")
//!     .global(LoggingMiddleware::new().into_stage())
//!     .target(RemoteTarget::function("Ping"))
//!     .build()?;
//! ```

use crate::channel::Acceptance;
use crate::middleware::{MiddlewareStage, StageCall};
use crate::target::TargetKind;
use hermes_telemetry::logging::fields;
use std::sync::Arc;
use tracing::{debug, info};

/// Label of the logging stage.
pub const LABEL: &str = "Logging";

/// Call logging stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware {
    log_args: bool,
}

impl LoggingMiddleware {
    /// Creates a logging stage that records argument counts only.
    #[must_use]
    pub const fn new() -> Self {
        Self { log_args: false }
    }

    /// Includes full argument values in log lines.
    #[must_use]
    pub const fn with_args(mut self) -> Self {
        self.log_args = true;
        self
    }

    /// Wraps this logger as a globally-enabled middleware stage.
    #[must_use]
    pub fn into_stage(self) -> Arc<MiddlewareStage> {
        MiddlewareStage::builder(LABEL)
            .on_both(move |call: StageCall| async move { self.settle(call) })
            .globally_enabled()
            .build()
    }

    fn settle(self, call: StageCall) {
        let label = call.target.diagnostic_label().to_string();
        let caller = call.caller.log_id();

        if self.log_args {
            info!(
                { fields::TARGET } = %label,
                { fields::DIRECTION } = %call.direction,
                { fields::CALLER } = %caller,
                args = ?call.args,
                "remote call"
            );
        } else {
            info!(
                { fields::TARGET } = %label,
                { fields::DIRECTION } = %call.direction,
                { fields::CALLER } = %caller,
                args = call.args.len(),
                "remote call"
            );
        }

        let mut acceptance = Acceptance::new().with_args(call.args.clone());
        if call.target.kind() == TargetKind::Function {
            acceptance = acceptance.with_transform(move |value| {
                debug!({ fields::TARGET } = %label, returned = %value, "remote call returned");
                value
            });
        }
        call.accept(acceptance);
    }
}
