//! Argument type checking stage.
//!
//! Rejects calls whose arguments do not match a declared list of
//! [`ValueKind`]s. Checks run on the receiving side by default, since that
//! is where untrusted payloads arrive; outbound checking can be enabled to
//! catch mistakes before they hit the wire.
//!
//! ```ignore
//! use hermes_core::ValueKind;
//! use hermes_middleware::stages::TypeCheckMiddleware;
//!
//! let check = TypeCheckMiddleware::new([ValueKind::Number, ValueKind::String])
//!     .strict_arity(true)
//!     .into_stage();
//! ```

use crate::middleware::{MiddlewareStage, StageCall};
use hermes_core::{Value, ValueKind};
use std::sync::Arc;

/// Label of the type checking stage.
pub const LABEL: &str = "TypeCheck";

/// Argument type checking stage.
#[derive(Debug, Clone)]
pub struct TypeCheckMiddleware {
    expected: Arc<[ValueKind]>,
    strict_arity: bool,
    check_outbound: bool,
}

impl TypeCheckMiddleware {
    /// Expects the leading arguments to have these kinds, in order.
    pub fn new(expected: impl IntoIterator<Item = ValueKind>) -> Self {
        Self {
            expected: expected.into_iter().collect(),
            strict_arity: false,
            check_outbound: false,
        }
    }

    /// Also rejects calls carrying more arguments than declared.
    #[must_use]
    pub fn strict_arity(mut self, strict: bool) -> Self {
        self.strict_arity = strict;
        self
    }

    /// Also checks calls before they are sent.
    #[must_use]
    pub fn check_outbound(mut self, enabled: bool) -> Self {
        self.check_outbound = enabled;
        self
    }

    /// Returns the declared argument kinds.
    #[must_use]
    pub fn expected(&self) -> &[ValueKind] {
        &self.expected
    }

    /// Checks an argument list, returning a description of the first
    /// mismatch.
    ///
    /// # Errors
    ///
    /// Returns the mismatch description, without the target label.
    pub fn check(&self, args: &[Value]) -> Result<(), String> {
        for (index, expected) in self.expected.iter().enumerate() {
            let position = index + 1;
            match args.get(index) {
                None => {
                    return Err(format!("argument #{position} expected {expected}, got nothing"));
                }
                Some(value) => {
                    let actual = ValueKind::of(value);
                    if actual != *expected {
                        return Err(format!(
                            "argument #{position} expected {expected}, got {actual}"
                        ));
                    }
                }
            }
        }

        if self.strict_arity && args.len() > self.expected.len() {
            return Err(format!(
                "expected {} arguments, got {}",
                self.expected.len(),
                args.len()
            ));
        }

        Ok(())
    }

    /// Wraps this checker as a middleware stage.
    #[must_use]
    pub fn into_stage(self) -> Arc<MiddlewareStage> {
        let check_outbound = self.check_outbound;
        let checker = Arc::new(self);
        let recv = Arc::clone(&checker);

        let builder = MiddlewareStage::builder(LABEL).on_recv(move |call: StageCall| {
            let checker = Arc::clone(&recv);
            async move { checker.settle(call) }
        });

        if check_outbound {
            builder
                .on_send(move |call: StageCall| {
                    let checker = Arc::clone(&checker);
                    async move { checker.settle(call) }
                })
                .build()
        } else {
            builder.build()
        }
    }

    fn settle(&self, call: StageCall) {
        match self.check(&call.args) {
            Ok(()) => {
                call.pass();
            }
            Err(mismatch) => {
                let label = call.target.diagnostic_label();
                let reason = format!("{label} {LABEL} failed: {mismatch}");
                call.reject(reason);
            }
        }
    }
}
