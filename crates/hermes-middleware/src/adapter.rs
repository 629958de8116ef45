//! Transport-facing entry points.
//!
//! The transport calls [`SenderAdapter::resolve_outbound`] before it sends a
//! call and [`ReceiverAdapter::resolve_inbound`] before it delivers one.
//! Both run the chain for their direction and report a typed
//! [`Rejection`] when any stage refuses the call.
//!
//! # Example
//!
//! ```ignore
//! let receiver = ReceiverAdapter::new(ExecutionContext::delivery());
//!
//! let reply = receiver
//!     .resolve_inbound(&ping, raw_args, |caller, args| async move {
//!         handle_ping(caller, args).await
//!     })
//!     .await?;
//! ```

use crate::chain::{ChainConfig, ChainExecutor};
use crate::target::RemoteTarget;
use hermes_core::{
    Args, CallerIdentity, Direction, ExecutionContext, Rejection, ReturnTransform, Value,
};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// A call cleared for sending.
#[derive(Debug, Clone)]
pub struct Outbound {
    /// Identity the call is sent as.
    pub peer: CallerIdentity,
    /// Arguments to put on the wire.
    pub args: Args,
    /// Transform the transport applies to whatever value comes back.
    pub transform: ReturnTransform,
}

/// Runs `Send` chains before calls leave this process.
#[derive(Debug, Clone)]
pub struct SenderAdapter {
    executor: ChainExecutor,
}

impl SenderAdapter {
    /// Creates a sender adapter with default chain settings.
    #[must_use]
    pub fn new(context: ExecutionContext) -> Self {
        Self::with_config(context, ChainConfig::default())
    }

    /// Creates a sender adapter with the given chain settings.
    #[must_use]
    pub fn with_config(context: ExecutionContext, config: ChainConfig) -> Self {
        Self {
            executor: ChainExecutor::with_config(context, config),
        }
    }

    /// Returns the underlying executor.
    #[must_use]
    pub const fn executor(&self) -> &ChainExecutor {
        &self.executor
    }

    /// Runs the send chain over an outgoing call.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] of the first stage that refused the call.
    /// The transport must not send a rejected call.
    pub async fn resolve_outbound(
        &self,
        target: &Arc<RemoteTarget>,
        raw: Args,
    ) -> Result<Outbound, Rejection> {
        let output = self
            .executor
            .run(target, Direction::Send, raw)
            .await
            .into_result()?;

        let transform = output.transform();
        debug!(
            target_label = %target.diagnostic_label(),
            args = output.args.len(),
            "outbound call cleared"
        );
        Ok(Outbound {
            peer: output.caller,
            args: output.args,
            transform,
        })
    }
}

/// Runs `Recv` chains before calls reach their handler.
#[derive(Debug, Clone)]
pub struct ReceiverAdapter {
    executor: ChainExecutor,
}

impl ReceiverAdapter {
    /// Creates a receiver adapter with default chain settings.
    #[must_use]
    pub fn new(context: ExecutionContext) -> Self {
        Self::with_config(context, ChainConfig::default())
    }

    /// Creates a receiver adapter with the given chain settings.
    #[must_use]
    pub fn with_config(context: ExecutionContext, config: ChainConfig) -> Self {
        Self {
            executor: ChainExecutor::with_config(context, config),
        }
    }

    /// Returns the underlying executor.
    #[must_use]
    pub const fn executor(&self) -> &ChainExecutor {
        &self.executor
    }

    /// Runs the receive chain, then the handler, then the collected
    /// transforms over the handler's return value.
    ///
    /// The handler gets the caller identity only on the delivering side.
    /// It is never invoked for a rejected call.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] of the first stage that refused the call.
    pub async fn resolve_inbound<F, Fut>(
        &self,
        target: &Arc<RemoteTarget>,
        raw: Args,
        handler: F,
    ) -> Result<Value, Rejection>
    where
        F: FnOnce(Option<CallerIdentity>, Args) -> Fut,
        Fut: Future<Output = Value>,
    {
        let output = self
            .executor
            .run(target, Direction::Recv, raw)
            .await
            .into_result()?;

        let caller = self
            .executor
            .context()
            .is_delivery()
            .then_some(output.caller);
        let value = handler(caller, output.args).await;

        Ok(output
            .transforms
            .iter()
            .fold(value, |value, transform| transform.apply(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Acceptance;
    use crate::middleware::{MiddlewareStage, StageCall};
    use crate::namespace::Namespace;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn target_with(stages: Vec<Arc<MiddlewareStage>>) -> Arc<RemoteTarget> {
        let ns = Namespace::builder("")
            .target(RemoteTarget::function("Ping").middlewares(stages))
            .build()
            .unwrap();
        Arc::clone(ns.target("Ping").unwrap())
    }

    fn wrap(label: &'static str) -> Arc<MiddlewareStage> {
        MiddlewareStage::builder(label)
            .on_both(move |call: StageCall| async move {
                let args = call.args.clone();
                call.accept(
                    Acceptance::new()
                        .with_args(args)
                        .with_transform(move |v| {
                            json!(format!("{label}({})", v.as_str().unwrap_or("")))
                        }),
                );
            })
            .build()
    }

    #[tokio::test]
    async fn test_inbound_folds_transforms_first_accepted_first() {
        let target = target_with(vec![wrap("a"), wrap("b")]);
        let receiver = ReceiverAdapter::new(ExecutionContext::delivery());

        let value = receiver
            .resolve_inbound(&target, vec![json!(9), json!("arg")], |caller, args| async move {
                assert_eq!(caller, Some(CallerIdentity::remote(9)));
                assert_eq!(args, vec![json!("arg")]);
                json!("v")
            })
            .await
            .unwrap();

        assert_eq!(value, json!("b(a(v))"));
    }

    #[tokio::test]
    async fn test_inbound_rejection_skips_handler() {
        let deny = MiddlewareStage::builder("deny")
            .on_recv(|call: StageCall| async move {
                call.reject("denied");
            })
            .build();
        let target = target_with(vec![deny]);
        let receiver = ReceiverAdapter::new(ExecutionContext::delivery());
        let called = AtomicBool::new(false);

        let err = receiver
            .resolve_inbound(&target, vec![json!(1)], |_, _| async {
                called.store(true, Ordering::SeqCst);
                Value::Null
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "denied");
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_inbound_on_origin_side_hides_caller() {
        let target = target_with(vec![]);
        let receiver = ReceiverAdapter::new(ExecutionContext::origin(CallerIdentity::local("me")));

        let value = receiver
            .resolve_inbound(&target, vec![json!(1)], |caller, args| async move {
                assert!(caller.is_none());
                args.into_iter().next().unwrap_or_default()
            })
            .await
            .unwrap();
        assert_eq!(value, json!(1));
    }

    #[tokio::test]
    async fn test_outbound_returns_args_and_composed_transform() {
        let target = target_with(vec![wrap("a"), wrap("b")]);
        let sender = SenderAdapter::new(ExecutionContext::origin(CallerIdentity::local("client")));

        let outbound = sender
            .resolve_outbound(&target, vec![json!("payload")])
            .await
            .unwrap();

        assert_eq!(outbound.peer, CallerIdentity::local("client"));
        assert_eq!(outbound.args, vec![json!("payload")]);
        assert_eq!(outbound.transform.apply(json!("r")), json!("b(a(r))"));
    }

    #[tokio::test]
    async fn test_outbound_empty_chain_is_identity() {
        let target = target_with(vec![]);
        let sender = SenderAdapter::new(ExecutionContext::origin(CallerIdentity::default()));

        let outbound = sender
            .resolve_outbound(&target, vec![json!(1), json!(2)])
            .await
            .unwrap();
        assert_eq!(outbound.args, vec![json!(1), json!(2)]);
        assert!(outbound.transform.is_identity());
    }

    #[tokio::test]
    async fn test_outbound_rejection() {
        let deny = MiddlewareStage::builder("deny")
            .on_send(|call: StageCall| async move {
                call.reject("not sending");
            })
            .build();
        let target = target_with(vec![deny]);
        let sender = SenderAdapter::new(ExecutionContext::origin(CallerIdentity::default()));

        let err = sender.resolve_outbound(&target, vec![]).await.unwrap_err();
        assert_eq!(err.stage(), Some("deny"));
    }
}
