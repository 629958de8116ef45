//! # Hermes Middleware
//!
//! Resolution and execution engine for middleware on Hermes remote calls.
//!
//! Before the transport sends a call, and again before it delivers one, the
//! call passes through an ordered chain of middleware stages. Each stage may
//! replace the arguments, contribute a transform for the return value, or
//! reject the call outright.
//!
//! ```text
//!                resolve_outbound                         resolve_inbound
//! caller ──► [Send chain] ──► transport ──► [Recv chain] ──► handler
//!    ▲                                                          │
//!    └──── send transforms ◄──── transport ◄── recv transforms ◄┘
//! ```
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`registry`] | Resolves a target's ordered, deduplicated stage list |
//! | [`channel`] | Runs one stage as a single await point with a timeout |
//! | [`chain`] | Threads arguments and transforms through the stage list |
//! | [`adapter`] | Sender and receiver entry points used by the transport |
//!
//! Namespaces, targets and stages are built once with [`Namespace::builder`]
//! and are immutable afterwards.
//!
//! ## Example
//!
//! ```ignore
//! use hermes_core::{ExecutionContext, ValueKind};
//! use hermes_middleware::stages::TypeCheckMiddleware;
//! use hermes_middleware::{Namespace, ReceiverAdapter, RemoteTarget};
//!
//! let ns = Namespace::builder("")
//!     .target(
//!         RemoteTarget::function("Ping")
//!             .middleware(TypeCheckMiddleware::new([ValueKind::Number]).into_stage()),
//!     )
//!     .build()?;
//!
//! let receiver = ReceiverAdapter::new(ExecutionContext::delivery());
//! let reply = receiver
//!     .resolve_inbound(ns.target("Ping").unwrap(), raw, |_caller, args| async move {
//!         args[0].clone()
//!     })
//!     .await?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod adapter;
pub mod chain;
pub mod channel;
pub mod error;
pub mod middleware;
pub mod namespace;
pub mod registry;
pub mod stages;
pub mod target;

pub use adapter::{Outbound, ReceiverAdapter, SenderAdapter};
pub use chain::{ChainConfig, ChainExecutor, ChainOutput, ChainState};
pub use channel::{Acceptance, Settle, Settlement, StageChannel, DEFAULT_STAGE_TIMEOUT};
pub use error::BuildError;
pub use middleware::{
    BoxFuture, BoxedCallback, MiddlewareCallback, MiddlewareStage, StageBuilder, StageCall,
    StageLabel, StageScope,
};
pub use namespace::{Namespace, NamespaceBuilder};
pub use registry::resolve;
pub use target::{GlobalStages, RemoteTarget, TargetBuilder, TargetKind};
