//! Built-in middleware stages.
//!
//! | Stage | Label | Directions | Purpose |
//! |-------|-------|------------|---------|
//! | [`LoggingMiddleware`] | `Logging` | send, recv | Log calls and returned values |
//! | [`TypeCheckMiddleware`] | `TypeCheck` | recv (send optional) | Reject mistyped arguments |
//! | [`RateLimitMiddleware`] | `RateLimit` | recv | Limit calls per caller |
//!
//! Each converts into a shareable stage with `into_stage()`.

pub mod logging;
pub mod rate_limit;
pub mod type_check;

pub use logging::LoggingMiddleware;
pub use rate_limit::{RateLimitBuilder, RateLimitMiddleware};
pub use type_check::TypeCheckMiddleware;
