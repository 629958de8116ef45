//! Middleware stages and the callback trait stage authors implement.
//!
//! A [`MiddlewareStage`] pairs two independent [`MiddlewareCallback`]s, one
//! run before a call is sent and one run before a call is delivered. A
//! callback receives a [`StageCall`] and settles it at a time of its choosing
//! by accepting (optionally replacing the arguments and contributing a
//! return-value transform) or rejecting with a reason.
//!
//! # Example
//!
//! ```ignore
//! use hermes_middleware::{MiddlewareStage, StageCall};
//!
//! let uppercase = MiddlewareStage::builder("uppercase")
//!     .on_recv(|call: StageCall| async move {
//!         let args = call
//!             .args
//!             .iter()
//!             .map(|v| v.as_str().map(str::to_uppercase).map_or(v.clone(), Into::into))
//!             .collect();
//!         call.settle.next(args);
//!     })
//!     .build();
//! ```

use crate::channel::{Acceptance, Settle};
use crate::target::RemoteTarget;
use hermes_core::{Args, CallerIdentity, Direction};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future, as returned by stage callbacks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The capability every middleware stage body implements.
///
/// The returned future is spawned as its own task. It may settle the call
/// synchronously before returning the future, from inside the future, or
/// from any task it hands the [`Settle`] handle to. If it never settles, the
/// stage channel's timeout rejects the call and aborts the task.
///
/// Any `Fn(StageCall) -> impl Future<Output = ()>` closure implements this
/// trait.
pub trait MiddlewareCallback: Send + Sync + 'static {
    /// Runs the stage body for one call.
    fn call(&self, call: StageCall) -> BoxFuture<'static, ()>;
}

impl<F, Fut> MiddlewareCallback for F
where
    F: Fn(StageCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, call: StageCall) -> BoxFuture<'static, ()> {
        Box::pin(self(call))
    }
}

/// A type-erased callback.
pub type BoxedCallback = Arc<dyn MiddlewareCallback>;

/// Everything a stage body gets for one invocation.
pub struct StageCall {
    /// The target being called.
    pub target: Arc<RemoteTarget>,
    /// Which direction this chain runs in.
    pub direction: Direction,
    /// Identity of the peer on the other end of the call.
    pub caller: CallerIdentity,
    /// Arguments as left by the previous stage.
    pub args: Args,
    /// One-shot settlement handle for this invocation.
    pub settle: Settle,
}

impl StageCall {
    /// Accepts the call with its current arguments and no return transform.
    pub fn pass(self) -> bool {
        let Self { args, settle, .. } = self;
        settle.next(args)
    }

    /// Accepts with replacement arguments and no return transform.
    pub fn next(&self, args: Args) -> bool {
        self.settle.next(args)
    }

    /// Accepts with an explicit [`Acceptance`].
    pub fn accept(&self, acceptance: Acceptance) -> bool {
        self.settle.accept(acceptance)
    }

    /// Rejects the call.
    pub fn reject(&self, reason: impl Into<String>) -> bool {
        self.settle.reject(reason)
    }
}

impl fmt::Debug for StageCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageCall")
            .field("target", &self.target.diagnostic_label())
            .field("direction", &self.direction)
            .field("caller", &self.caller)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Identifies a stage for deduplication and diagnostics.
///
/// Two stages with equal `Named` labels collapse to the first occurrence
/// when a chain is resolved. `Unlabeled` stages are never collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StageLabel {
    /// A label that participates in deduplication.
    Named(Arc<str>),
    /// No label; never deduplicated.
    Unlabeled,
}

impl StageLabel {
    /// Returns the label text, or `"unlabeled"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Unlabeled => "unlabeled",
        }
    }

    /// Returns the key used for deduplication, if any.
    #[must_use]
    pub fn dedup_key(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Unlabeled => None,
        }
    }
}

impl From<&str> for StageLabel {
    fn from(name: &str) -> Self {
        Self::Named(name.into())
    }
}

impl From<String> for StageLabel {
    fn from(name: String) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Display for StageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a stage may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StageScope {
    /// Bound directly to individual targets.
    #[default]
    Target,
    /// Usable in a namespace's global list. A globally-enabled stage bound
    /// to a target must also be declared globally on that namespace.
    Global,
}

/// A labeled pair of direction-specific callbacks.
///
/// Stages are immutable once built and shared by `Arc` across every target
/// that includes them.
pub struct MiddlewareStage {
    label: StageLabel,
    scope: StageScope,
    send: BoxedCallback,
    recv: BoxedCallback,
}

impl MiddlewareStage {
    /// Starts building a labeled stage.
    pub fn builder(label: impl Into<StageLabel>) -> StageBuilder {
        StageBuilder::new(label.into())
    }

    /// Starts building a stage that is never deduplicated.
    #[must_use]
    pub fn unlabeled() -> StageBuilder {
        StageBuilder::new(StageLabel::Unlabeled)
    }

    /// Returns the stage label.
    #[must_use]
    pub const fn label(&self) -> &StageLabel {
        &self.label
    }

    /// Returns the stage scope.
    #[must_use]
    pub const fn scope(&self) -> StageScope {
        self.scope
    }

    /// Returns true if the stage may appear in a namespace's global list.
    #[must_use]
    pub const fn is_globally_enabled(&self) -> bool {
        matches!(self.scope, StageScope::Global)
    }

    /// Returns the callback for a direction.
    #[must_use]
    pub fn callback(&self, direction: Direction) -> &BoxedCallback {
        match direction {
            Direction::Send => &self.send,
            Direction::Recv => &self.recv,
        }
    }
}

impl fmt::Debug for MiddlewareStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareStage")
            .field("label", &self.label)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Builder for [`MiddlewareStage`].
///
/// A direction left unset passes calls through unchanged.
pub struct StageBuilder {
    label: StageLabel,
    scope: StageScope,
    send: Option<BoxedCallback>,
    recv: Option<BoxedCallback>,
}

impl StageBuilder {
    fn new(label: StageLabel) -> Self {
        Self {
            label,
            scope: StageScope::Target,
            send: None,
            recv: None,
        }
    }

    /// Sets the callback run before a call is sent.
    #[must_use]
    pub fn on_send<C: MiddlewareCallback>(mut self, callback: C) -> Self {
        self.send = Some(Arc::new(callback));
        self
    }

    /// Sets the callback run before a call is delivered.
    #[must_use]
    pub fn on_recv<C: MiddlewareCallback>(mut self, callback: C) -> Self {
        self.recv = Some(Arc::new(callback));
        self
    }

    /// Uses one callback for both directions.
    #[must_use]
    pub fn on_both<C: MiddlewareCallback>(mut self, callback: C) -> Self {
        let callback: BoxedCallback = Arc::new(callback);
        self.send = Some(Arc::clone(&callback));
        self.recv = Some(callback);
        self
    }

    /// Marks the stage as usable in a namespace's global list.
    #[must_use]
    pub fn globally_enabled(mut self) -> Self {
        self.scope = StageScope::Global;
        self
    }

    /// Builds the stage.
    #[must_use]
    pub fn build(self) -> Arc<MiddlewareStage> {
        let pass: BoxedCallback = Arc::new(PassThrough);
        Arc::new(MiddlewareStage {
            label: self.label,
            scope: self.scope,
            send: self.send.unwrap_or_else(|| Arc::clone(&pass)),
            recv: self.recv.unwrap_or(pass),
        })
    }
}

/// Accepts every call unchanged.
struct PassThrough;

impl MiddlewareCallback for PassThrough {
    fn call(&self, call: StageCall) -> BoxFuture<'static, ()> {
        call.pass();
        Box::pin(async {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_text() {
        assert_eq!(StageLabel::from("auth").as_str(), "auth");
        assert_eq!(StageLabel::Unlabeled.as_str(), "unlabeled");
        assert_eq!(StageLabel::from(String::from("x")).to_string(), "x");
    }

    #[test]
    fn test_dedup_key() {
        assert_eq!(StageLabel::from("auth").dedup_key(), Some("auth"));
        assert_eq!(StageLabel::Unlabeled.dedup_key(), None);
    }

    #[test]
    fn test_builder_defaults_to_target_scope() {
        let stage = MiddlewareStage::builder("log").build();
        assert_eq!(stage.scope(), StageScope::Target);
        assert!(!stage.is_globally_enabled());
        assert_eq!(stage.label(), &StageLabel::from("log"));
    }

    #[test]
    fn test_builder_globally_enabled() {
        let stage = MiddlewareStage::unlabeled().globally_enabled().build();
        assert!(stage.is_globally_enabled());
        assert_eq!(stage.label(), &StageLabel::Unlabeled);
    }

    #[test]
    fn test_on_both_shares_callback() {
        let stage = MiddlewareStage::builder("both")
            .on_both(|call: StageCall| async move {
                call.pass();
            })
            .build();
        assert!(Arc::ptr_eq(
            stage.callback(Direction::Send),
            stage.callback(Direction::Recv)
        ));
    }

    #[test]
    fn test_debug_hides_callbacks() {
        let stage = MiddlewareStage::builder("dbg").build();
        let debug = format!("{stage:?}");
        assert!(debug.contains("dbg"));
        assert!(debug.contains("Target"));
    }
}
