//! Chain execution.
//!
//! [`ChainExecutor::run`] drives a target's resolved stage list through the
//! [`StageChannel`] one stage at a time, threading the argument list from
//! each accepting stage into the next and collecting return-value
//! transforms. The first rejection ends the chain.
//!
//! ```text
//! raw args ──split_caller──► [stage 1] ──► [stage 2] ──► ... ──► ChainState
//!                               │ reject
//!                               └──────────────────────────────► ChainState (failed)
//! ```

use crate::channel::{StageChannel, DEFAULT_STAGE_TIMEOUT};
use crate::registry;
use crate::target::RemoteTarget;
use hermes_core::{
    Args, CallId, CallerIdentity, Direction, ExecutionContext, MissingArguments, Rejection,
    ReturnTransform,
};
use hermes_telemetry::metrics::{record_chain, record_stage};
use hermes_telemetry::InFlightGuard;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info_span, warn, Instrument};

/// Settings shared by every chain an executor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfig {
    /// Timeout applied to every stage invocation.
    pub timeout: Duration,
    /// What the next stage receives when a stage accepts without arguments.
    pub missing_arguments: MissingArguments,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_STAGE_TIMEOUT,
            missing_arguments: MissingArguments::default(),
        }
    }
}

impl ChainConfig {
    /// Sets the per-stage timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the missing-arguments policy.
    #[must_use]
    pub const fn with_missing_arguments(mut self, policy: MissingArguments) -> Self {
        self.missing_arguments = policy;
        self
    }
}

/// The terminal state of one chain run.
#[derive(Debug)]
pub struct ChainState {
    caller: Option<CallerIdentity>,
    args: Args,
    transforms: Vec<ReturnTransform>,
    failure: Option<Rejection>,
    stages_run: usize,
}

impl ChainState {
    fn failed(failure: Rejection) -> Self {
        Self {
            caller: None,
            args: Vec::new(),
            transforms: Vec::new(),
            failure: Some(failure),
            stages_run: 0,
        }
    }

    /// Returns the caller identity split from the raw arguments.
    #[must_use]
    pub const fn caller(&self) -> Option<&CallerIdentity> {
        self.caller.as_ref()
    }

    /// Returns the argument list as left by the last accepting stage.
    #[must_use]
    pub fn args(&self) -> &[hermes_core::Value] {
        &self.args
    }

    /// Returns the collected transforms in chain order.
    #[must_use]
    pub fn transforms(&self) -> &[ReturnTransform] {
        &self.transforms
    }

    /// Returns the rejection that ended the chain, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&Rejection> {
        self.failure.as_ref()
    }

    /// Returns true if every stage accepted.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Returns how many stages were invoked, including a rejecting one.
    #[must_use]
    pub const fn stages_run(&self) -> usize {
        self.stages_run
    }

    /// Converts into the chain's outcome.
    ///
    /// # Errors
    ///
    /// Returns the rejection that ended the chain.
    pub fn into_result(self) -> Result<ChainOutput, Rejection> {
        match self.failure {
            Some(rejection) => Err(rejection),
            None => Ok(ChainOutput {
                caller: self.caller.unwrap_or_default(),
                args: self.args,
                transforms: self.transforms,
            }),
        }
    }
}

/// A successful chain's output.
#[derive(Debug)]
pub struct ChainOutput {
    /// The caller identity.
    pub caller: CallerIdentity,
    /// The final argument list.
    pub args: Args,
    /// Transforms in the order their stages accepted.
    pub transforms: Vec<ReturnTransform>,
}

impl ChainOutput {
    /// Composes the collected transforms; the first accepted is applied first.
    #[must_use]
    pub fn transform(&self) -> ReturnTransform {
        ReturnTransform::compose(self.transforms.iter().cloned())
    }
}

/// Runs middleware chains for one execution context.
#[derive(Debug, Clone)]
pub struct ChainExecutor {
    context: ExecutionContext,
    config: ChainConfig,
    channel: StageChannel,
}

impl ChainExecutor {
    /// Creates an executor with default settings.
    #[must_use]
    pub fn new(context: ExecutionContext) -> Self {
        Self::with_config(context, ChainConfig::default())
    }

    /// Creates an executor with the given settings.
    #[must_use]
    pub fn with_config(context: ExecutionContext, config: ChainConfig) -> Self {
        Self {
            context,
            config,
            channel: StageChannel::new(config.timeout),
        }
    }

    /// Returns the execution context.
    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Returns the chain settings.
    #[must_use]
    pub const fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Runs the chain for `target` in `direction` over the raw arguments.
    ///
    /// On the delivering side the first raw argument is taken as the
    /// caller identity; a call with no arguments fails with
    /// [`Rejection::MissingCaller`] before any stage runs.
    pub async fn run(
        &self,
        target: &Arc<RemoteTarget>,
        direction: Direction,
        raw: Args,
    ) -> ChainState {
        let call_id = CallId::new();
        let span = info_span!(
            "middleware_chain",
            call_id = %call_id,
            target_label = %target.diagnostic_label(),
            direction = %direction,
        );
        self.run_inner(target, direction, raw).instrument(span).await
    }

    async fn run_inner(
        &self,
        target: &Arc<RemoteTarget>,
        direction: Direction,
        raw: Args,
    ) -> ChainState {
        let _in_flight = InFlightGuard::new();
        let label = target.diagnostic_label();

        let Some((caller, args)) = self.context.split_caller(raw) else {
            let rejection = Rejection::missing_caller(label);
            warn!(reason = %rejection, "call rejected before middleware");
            record_chain(label, direction.name(), rejection.outcome());
            return ChainState::failed(rejection);
        };

        let stages = registry::resolve(target);
        let mut state = ChainState {
            caller: Some(caller.clone()),
            args,
            transforms: Vec::with_capacity(stages.len()),
            failure: None,
            stages_run: 0,
        };

        for stage in &stages {
            let preserved = match self.config.missing_arguments {
                MissingArguments::Preserve => Some(state.args.clone()),
                MissingArguments::Empty => None,
            };
            let args = std::mem::take(&mut state.args);
            let started = Instant::now();
            let settlement = self
                .channel
                .invoke(stage, target, direction, caller.clone(), args)
                .await;
            state.stages_run += 1;

            let outcome = settlement.as_ref().map_or_else(Rejection::outcome, |_| "accepted");
            record_stage(
                label,
                stage.label().as_str(),
                direction.name(),
                outcome,
                started.elapsed(),
            );

            match settlement {
                Ok(acceptance) => {
                    let (args, transform) = acceptance.into_parts();
                    state.args = args.or(preserved).unwrap_or_default();
                    state.transforms.push(transform);
                    debug!(stage = %stage.label(), args = state.args.len(), "stage accepted");
                }
                Err(rejection) => {
                    warn!(stage = %stage.label(), reason = %rejection, "stage rejected call");
                    state.failure = Some(rejection);
                    break;
                }
            }
        }

        let outcome = state.failure.as_ref().map_or("accepted", Rejection::outcome);
        record_chain(label, direction.name(), outcome);
        state
    }
}
