//! The stage channel: one middleware invocation as a single await point.
//!
//! Stage bodies settle their call through a [`Settle`] handle whenever they
//! choose, possibly from another task. [`StageChannel::invoke`] turns that
//! into a future that resolves exactly once, with whichever of these arrives
//! first:
//!
//! | Trigger | Settlement |
//! |---------|------------|
//! | [`Settle::accept`] / [`Settle::next`] | `Ok(Acceptance)` |
//! | [`Settle::reject`] | `Err(Rejection::Rejected)` |
//! | timeout elapses | `Err(Rejection::TimedOut)` |
//! | body panics | `Err(Rejection::Panicked)` |
//!
//! All triggers converge on one idempotent close. Later triggers are
//! ignored and report `false`. When the invocation finishes, the stage body
//! task is aborted if it is still running; aborting a finished task is a
//! no-op.

use crate::middleware::{MiddlewareStage, StageCall};
use crate::target::RemoteTarget;
use hermes_core::{Args, CallerIdentity, Direction, Rejection, ReturnTransform, Value};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Default per-stage timeout.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// The result of one stage invocation.
pub type Settlement = Result<Acceptance, Rejection>;

/// What an accepting stage hands to the next one.
#[derive(Debug, Clone, Default)]
pub struct Acceptance {
    args: Option<Args>,
    transform: ReturnTransform,
}

impl Acceptance {
    /// Accepts without supplying arguments and without a return transform.
    ///
    /// What the next stage sees is decided by the chain's
    /// [`MissingArguments`](hermes_core::MissingArguments) policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the arguments passed to the next stage.
    #[must_use]
    pub fn with_args(mut self, args: Args) -> Self {
        self.args = Some(args);
        self
    }

    /// Sets the transform applied to the call's return value.
    #[must_use]
    pub fn with_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = ReturnTransform::new(f);
        self
    }

    /// Returns the supplied arguments, if any.
    #[must_use]
    pub fn args(&self) -> Option<&Args> {
        self.args.as_ref()
    }

    /// Returns the return-value transform.
    #[must_use]
    pub const fn transform(&self) -> &ReturnTransform {
        &self.transform
    }

    /// Splits into arguments and transform.
    #[must_use]
    pub fn into_parts(self) -> (Option<Args>, ReturnTransform) {
        (self.args, self.transform)
    }
}

struct ChannelState {
    settled: AtomicBool,
    waiter: Mutex<Option<oneshot::Sender<Settlement>>>,
    target: String,
    stage: String,
}

impl ChannelState {
    /// Settles the channel. Only the first call has any effect.
    fn close(&self, settlement: Settlement) -> bool {
        if self.settled.swap(true, Ordering::AcqRel) {
            debug!(
                target_label = %self.target,
                stage = %self.stage,
                "ignoring redundant settlement"
            );
            return false;
        }
        if let Some(waiter) = self.waiter.lock().take() {
            // The receiver is gone only if the invocation itself was dropped.
            let _ = waiter.send(settlement);
        }
        true
    }
}

/// The settlement handle given to a stage body.
///
/// Cloneable and `Send`, so a body may hand it to other tasks. Every method
/// returns `true` if it settled the call and `false` if the call had
/// already been settled by an earlier call or by the timeout.
#[derive(Clone)]
pub struct Settle {
    state: Arc<ChannelState>,
}

impl Settle {
    /// Accepts the call.
    pub fn accept(&self, acceptance: Acceptance) -> bool {
        self.state.close(Ok(acceptance))
    }

    /// Accepts with replacement arguments and no return transform.
    pub fn next(&self, args: Args) -> bool {
        self.accept(Acceptance::new().with_args(args))
    }

    /// Rejects the call with a reason.
    pub fn reject(&self, reason: impl Into<String>) -> bool {
        let state = &self.state;
        state.close(Err(Rejection::rejected(
            state.target.as_str(),
            state.stage.as_str(),
            reason,
        )))
    }

    /// Returns true once the call has been settled by anyone.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state.settled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Settle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settle")
            .field("target", &self.state.target)
            .field("stage", &self.state.stage)
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Aborts the stage body when the invocation ends, however it ends.
struct BodyGuard(JoinHandle<()>);

impl Drop for BodyGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs single stage invocations under a timeout.
#[derive(Debug, Clone, Copy)]
pub struct StageChannel {
    timeout: Duration,
}

impl Default for StageChannel {
    fn default() -> Self {
        Self::new(DEFAULT_STAGE_TIMEOUT)
    }
}

impl StageChannel {
    /// Creates a channel with the given per-stage timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the per-stage timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invokes one stage and waits for it to settle.
    ///
    /// The stage's direction-specific callback runs on its own task. This
    /// future resolves when the call is settled, and never later than the
    /// timeout. Dropping the future aborts the stage body.
    pub async fn invoke(
        &self,
        stage: &MiddlewareStage,
        target: &Arc<RemoteTarget>,
        direction: Direction,
        caller: CallerIdentity,
        args: Args,
    ) -> Settlement {
        let (tx, mut rx) = oneshot::channel();
        let state = Arc::new(ChannelState {
            settled: AtomicBool::new(false),
            waiter: Mutex::new(Some(tx)),
            target: target.diagnostic_label().to_string(),
            stage: stage.label().to_string(),
        });

        let call = StageCall {
            target: Arc::clone(target),
            direction,
            caller,
            args,
            settle: Settle {
                state: Arc::clone(&state),
            },
        };
        let callback = Arc::clone(stage.callback(direction));
        let mut body = BodyGuard(tokio::spawn(async move { callback.call(call).await }));

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);
        let mut body_running = true;
        let mut timer_running = true;

        loop {
            tokio::select! {
                biased;

                settlement = &mut rx => {
                    return settlement.unwrap_or_else(|_| {
                        Err(Rejection::interrupted(state.target.as_str(), state.stage.as_str()))
                    });
                }

                joined = &mut body.0, if body_running => {
                    body_running = false;
                    if let Err(err) = joined {
                        if err.is_panic() {
                            let message = panic_message(err.into_panic());
                            error!(
                                target_label = %state.target,
                                stage = %state.stage,
                                panic = %message,
                                "middleware stage panicked"
                            );
                            state.close(Err(Rejection::panicked(
                                state.target.as_str(),
                                state.stage.as_str(),
                                message,
                            )));
                        }
                    }
                }

                () = &mut deadline, if timer_running => {
                    timer_running = false;
                    if state.close(Err(Rejection::timed_out(
                        state.target.as_str(),
                        state.stage.as_str(),
                        self.timeout,
                    ))) {
                        warn!(
                            target_label = %state.target,
                            stage = %state.stage,
                            timeout_secs = self.timeout.as_secs_f64(),
                            "middleware stage timed out"
                        );
                    }
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::Namespace;
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    fn ping() -> Arc<RemoteTarget> {
        let ns = Namespace::builder("")
            .target(RemoteTarget::function("Ping"))
            .build()
            .unwrap();
        Arc::clone(ns.target("Ping").unwrap())
    }

    async fn run(channel: StageChannel, stage: &MiddlewareStage, args: Args) -> Settlement {
        channel
            .invoke(stage, &ping(), Direction::Recv, CallerIdentity::remote(1), args)
            .await
    }

    #[tokio::test]
    async fn test_accept_passes_args_and_transform() {
        let stage = MiddlewareStage::builder("double")
            .on_recv(|call: StageCall| async move {
                let doubled = call
                    .args
                    .iter()
                    .map(|v| json!(v.as_i64().unwrap_or(0) * 2))
                    .collect();
                call.accept(
                    Acceptance::new()
                        .with_args(doubled)
                        .with_transform(|v| json!(format!("<{v}>"))),
                );
            })
            .build();

        let acceptance = run(StageChannel::default(), &stage, vec![json!(2), json!(3)])
            .await
            .unwrap();
        assert_eq!(acceptance.args(), Some(&vec![json!(4), json!(6)]));
        assert_eq!(acceptance.transform().apply(json!(1)), json!("<1>"));
    }

    #[tokio::test]
    async fn test_accept_without_args() {
        let stage = MiddlewareStage::builder("bare")
            .on_recv(|call: StageCall| async move {
                call.accept(Acceptance::new());
            })
            .build();

        let acceptance = run(StageChannel::default(), &stage, vec![json!(1)]).await.unwrap();
        assert!(acceptance.args().is_none());
        assert!(acceptance.transform().is_identity());
    }

    #[tokio::test]
    async fn test_reject_carries_target_and_stage() {
        let stage = MiddlewareStage::builder("auth")
            .on_recv(|call: StageCall| async move {
                call.reject("not allowed");
            })
            .build();

        let err = run(StageChannel::default(), &stage, vec![]).await.unwrap_err();
        assert_eq!(err, Rejection::rejected("Function 'Ping'", "auth", "not allowed"));
        assert_eq!(err.to_string(), "not allowed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_at_exact_duration() {
        let stage = MiddlewareStage::builder("stuck")
            .on_recv(|call: StageCall| async move {
                let _held = call;
                std::future::pending::<()>().await;
            })
            .build();

        let start = Instant::now();
        let err = run(StageChannel::default(), &stage, vec![]).await.unwrap_err();

        assert_eq!(start.elapsed(), Duration::from_secs(60));
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Function 'Ping' middleware processing has timed out. (60s)"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_just_before_timeout_wins() {
        let stage = MiddlewareStage::builder("slow")
            .on_recv(|call: StageCall| async move {
                tokio::time::sleep(Duration::from_secs(9)).await;
                call.pass();
            })
            .build();

        let start = Instant::now();
        let result = run(StageChannel::new(Duration::from_secs(10)), &stage, vec![]).await;

        assert!(result.is_ok());
        assert_eq!(start.elapsed(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_uses_configured_duration() {
        let stage = MiddlewareStage::builder("slow")
            .on_recv(|call: StageCall| async move {
                tokio::time::sleep(Duration::from_secs(11)).await;
                call.pass();
            })
            .build();

        let err = run(StageChannel::new(Duration::from_secs(10)), &stage, vec![])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Function 'Ping' middleware processing has timed out. (10s)"
        );
    }

    #[tokio::test]
    async fn test_redundant_settlement_is_ignored() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let stage = MiddlewareStage::builder("twice")
            .on_recv(move |call: StageCall| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(call.next(vec![json!("first")]));
                    let _ = tx.send(call.reject("too late"));
                    let _ = tx.send(call.next(vec![json!("second")]));
                    let _ = tx.send(call.settle.is_settled());
                }
            })
            .build();

        let acceptance = run(StageChannel::default(), &stage, vec![]).await.unwrap();
        assert_eq!(acceptance.args(), Some(&vec![json!("first")]));

        let mut flags = Vec::new();
        for _ in 0..4 {
            flags.push(rx.recv().await.unwrap());
        }
        assert_eq!(flags, vec![true, false, false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_after_timeout_is_ignored() {
        let (late_tx, late_rx) = oneshot::channel();
        let late_tx = Arc::new(Mutex::new(Some(late_tx)));
        let stage = MiddlewareStage::builder("late")
            .on_recv(move |call: StageCall| {
                let report = late_tx.lock().take();
                async move {
                    let settle = call.settle.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_secs(70)).await;
                        let accepted = settle.next(Vec::new());
                        if let Some(report) = report {
                            let _ = report.send(accepted);
                        }
                    });
                }
            })
            .build();

        let err = run(StageChannel::default(), &stage, vec![]).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(late_rx.await, Ok(false));
    }

    #[tokio::test]
    async fn test_settle_from_another_task() {
        let stage = MiddlewareStage::builder("handoff")
            .on_recv(|call: StageCall| async move {
                let settle = call.settle.clone();
                let args = call.args.clone();
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    settle.next(args);
                });
            })
            .build();

        let acceptance = run(StageChannel::default(), &stage, vec![json!("x")]).await.unwrap();
        assert_eq!(acceptance.args(), Some(&vec![json!("x")]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_body_is_aborted_on_timeout() {
        let (alive_tx, alive_rx) = oneshot::channel::<()>();
        let alive_tx = Arc::new(Mutex::new(Some(alive_tx)));
        let stage = MiddlewareStage::builder("stuck")
            .on_recv(move |call: StageCall| {
                let alive = alive_tx.lock().take();
                async move {
                    let _held = (call, alive);
                    std::future::pending::<()>().await;
                }
            })
            .build();

        let result = run(StageChannel::default(), &stage, vec![]).await;
        assert!(result.unwrap_err().is_timeout());

        // The sender is dropped only when the aborted body is torn down.
        assert!(alive_rx.await.is_err());
    }

    #[tokio::test]
    async fn test_body_still_running_after_accept_is_aborted() {
        let (alive_tx, alive_rx) = oneshot::channel::<()>();
        let alive_tx = Arc::new(Mutex::new(Some(alive_tx)));
        let stage = MiddlewareStage::builder("lingering")
            .on_recv(move |call: StageCall| {
                let alive = alive_tx.lock().take();
                async move {
                    call.settle.next(Vec::new());
                    let _held = alive;
                    std::future::pending::<()>().await;
                }
            })
            .build();

        assert!(run(StageChannel::default(), &stage, vec![]).await.is_ok());
        assert!(alive_rx.await.is_err());
    }

    #[tokio::test]
    async fn test_panicking_body_is_a_rejection() {
        let stage = MiddlewareStage::builder("boom")
            .on_recv(|_call: StageCall| async move {
                panic!("kaboom");
            })
            .build();

        let err = run(StageChannel::default(), &stage, vec![]).await.unwrap_err();
        assert_eq!(err.outcome(), "panicked");
        assert!(err.to_string().contains("kaboom"));
        assert!(err.to_string().contains("Function 'Ping'"));
    }

    #[tokio::test]
    async fn test_send_direction_uses_send_callback() {
        let stage = MiddlewareStage::builder("dir")
            .on_send(|call: StageCall| async move {
                call.next(vec![json!("send")]);
            })
            .on_recv(|call: StageCall| async move {
                call.next(vec![json!("recv")]);
            })
            .build();

        let acceptance = StageChannel::default()
            .invoke(&stage, &ping(), Direction::Send, CallerIdentity::local(0), vec![])
            .await
            .unwrap();
        assert_eq!(acceptance.args(), Some(&vec![json!("send")]));
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(5_u8)), "unknown panic");
    }
}
