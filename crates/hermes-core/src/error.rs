//! Rejection type for middleware chains.
//!
//! A [`Rejection`] is the expected, recoverable failure of a remote call:
//! some stage refused it, or failed to decide in time. It flows as a plain
//! value from the stage channel through the chain executor and the call
//! adapters to the original caller.
//!
//! | Variant | Produced by |
//! |---|---|
//! | `Rejected` | A stage calling its reject continuation |
//! | `TimedOut` | The stage channel when the per-stage timeout elapses |
//! | `Panicked` | The stage channel when a stage body panics before settling |
//! | `MissingCaller` | The chain executor when no caller identity can be extracted |
//! | `Interrupted` | The stage channel when its settlement signal is lost |

use std::time::Duration;
use thiserror::Error;

/// Why a middleware chain did not let a call through.
///
/// # Example
///
/// ```
/// use hermes_core::Rejection;
/// use std::time::Duration;
///
/// let timeout = Rejection::timed_out("Function 'Ping'", "slow", Duration::from_secs(60));
/// assert_eq!(
///     timeout.to_string(),
///     "Function 'Ping' middleware processing has timed out. (60s)"
/// );
/// assert!(timeout.is_timeout());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A stage explicitly rejected the call.
    #[error("{reason}")]
    Rejected {
        /// Diagnostic label of the target.
        target: String,
        /// Label of the rejecting stage.
        stage: String,
        /// Reason supplied by the stage.
        reason: String,
    },

    /// A stage did not settle before the timeout elapsed.
    #[error("{target} middleware processing has timed out. ({}s)", .timeout.as_secs_f64())]
    TimedOut {
        /// Diagnostic label of the target.
        target: String,
        /// Label of the stage that timed out.
        stage: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// A stage body panicked before settling.
    #[error("{target} middleware '{stage}' panicked: {message}")]
    Panicked {
        /// Diagnostic label of the target.
        target: String,
        /// Label of the panicking stage.
        stage: String,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// The delivering side received no caller identity.
    #[error("{target} received a call without a caller identity")]
    MissingCaller {
        /// Diagnostic label of the target.
        target: String,
    },

    /// The settlement signal was dropped without a result.
    #[error("{target} middleware '{stage}' closed without settling")]
    Interrupted {
        /// Diagnostic label of the target.
        target: String,
        /// Label of the stage.
        stage: String,
    },
}

impl Rejection {
    /// Creates a stage rejection.
    pub fn rejected(
        target: impl Into<String>,
        stage: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            target: target.into(),
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Creates a timeout rejection.
    pub fn timed_out(
        target: impl Into<String>,
        stage: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self::TimedOut {
            target: target.into(),
            stage: stage.into(),
            timeout,
        }
    }

    /// Creates a panic rejection.
    pub fn panicked(
        target: impl Into<String>,
        stage: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Panicked {
            target: target.into(),
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Creates a missing-caller rejection.
    pub fn missing_caller(target: impl Into<String>) -> Self {
        Self::MissingCaller {
            target: target.into(),
        }
    }

    /// Creates an interrupted rejection.
    pub fn interrupted(target: impl Into<String>, stage: impl Into<String>) -> Self {
        Self::Interrupted {
            target: target.into(),
            stage: stage.into(),
        }
    }

    /// Returns the diagnostic label of the target.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Rejected { target, .. }
            | Self::TimedOut { target, .. }
            | Self::Panicked { target, .. }
            | Self::MissingCaller { target }
            | Self::Interrupted { target, .. } => target,
        }
    }

    /// Returns the label of the stage responsible, if any.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::Rejected { stage, .. }
            | Self::TimedOut { stage, .. }
            | Self::Panicked { stage, .. }
            | Self::Interrupted { stage, .. } => Some(stage),
            Self::MissingCaller { .. } => None,
        }
    }

    /// Returns the human-readable rejection reason.
    #[must_use]
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Returns true if this rejection was synthesized by the timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Returns the metric label for this rejection.
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::TimedOut { .. } => "timed_out",
            Self::Panicked { .. } => "panicked",
            Self::MissingCaller { .. } => "missing_caller",
            Self::Interrupted { .. } => "interrupted",
        }
    }
}
