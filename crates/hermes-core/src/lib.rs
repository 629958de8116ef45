//! # Hermes Core
//!
//! Core types shared by every Hermes crate.
//!
//! This crate provides the vocabulary the middleware engine and its
//! collaborators (transports, builders, middleware authors) agree on:
//!
//! - [`Value`] / [`Args`] - The opaque argument list a remote call carries
//! - [`ReturnTransform`] - A post-processing function over a call's return value
//! - [`CallerIdentity`] - Who made the call (local or remote)
//! - [`ExecutionContext`] / [`Side`] - Which side of the transport is executing
//! - [`Direction`] - Outbound (`Send`) or inbound (`Recv`) processing
//! - [`CallId`] - UUID v7 call identifier for log correlation
//! - [`Rejection`] - The failure value produced by a middleware chain

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod identity;
mod value;

pub use context::{CallId, Direction, ExecutionContext, MissingArguments, Side};
pub use error::Rejection;
pub use identity::CallerIdentity;
pub use value::{Args, ReturnTransform, Value, ValueKind};
