//! Argument and return-value types.
//!
//! Hermes treats call arguments as an opaque, ordered list of [`Value`]s.
//! Serialization of those values is the transport's concern; middleware only
//! reads, replaces, or rejects them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A single argument or return value.
pub use serde_json::Value;

/// The ordered argument list of a remote call.
pub type Args = Vec<Value>;

/// Coarse classification of a [`Value`], used by type-checking middleware
/// and in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// `null`.
    Null,
    /// `true` or `false`.
    Bool,
    /// Any number.
    Number,
    /// A string.
    String,
    /// An ordered list.
    Array,
    /// A key/value map.
    Object,
}

impl ValueKind {
    /// Classifies a value.
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Returns the lowercase name of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A function applied to a call's return value after the real action ran.
///
/// Every stage that accepts a call contributes one transform. The engine
/// folds them in chain order, so the first accepted stage's transform is
/// applied first.
///
/// # Example
///
/// ```
/// use hermes_core::{ReturnTransform, Value};
///
/// let double = ReturnTransform::new(|v: Value| Value::from(v.as_i64().unwrap_or(0) * 2));
/// let add_one = ReturnTransform::new(|v: Value| Value::from(v.as_i64().unwrap_or(0) + 1));
///
/// let composed = ReturnTransform::compose([double, add_one]);
/// assert_eq!(composed.apply(Value::from(5)), Value::from(11));
/// ```
#[derive(Clone)]
pub struct ReturnTransform(Option<Arc<dyn Fn(Value) -> Value + Send + Sync>>);

impl ReturnTransform {
    /// Wraps a function as a return-value transform.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self(Some(Arc::new(f)))
    }

    /// The transform that returns its input unchanged.
    #[must_use]
    pub const fn identity() -> Self {
        Self(None)
    }

    /// Returns true if this is the identity transform.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.0.is_none()
    }

    /// Applies this transform to a value.
    #[must_use]
    pub fn apply(&self, value: Value) -> Value {
        match &self.0 {
            Some(f) => f(value),
            None => value,
        }
    }

    /// Returns a transform that applies `self` and then `next`.
    #[must_use]
    pub fn then(self, next: Self) -> Self {
        match (self.0, next.0) {
            (None, None) => Self(None),
            (Some(f), None) | (None, Some(f)) => Self(Some(f)),
            (Some(first), Some(second)) => Self::new(move |v| second(first(v))),
        }
    }

    /// Composes transforms in order: the first element is applied first.
    ///
    /// Identity transforms are skipped, so composing an empty list yields
    /// the identity.
    #[must_use]
    pub fn compose<I>(transforms: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        transforms
            .into_iter()
            .fold(Self::identity(), Self::then)
    }
}

impl Default for ReturnTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for ReturnTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            f.write_str("ReturnTransform(identity)")
        } else {
            f.write_str("ReturnTransform(<fn>)")
        }
    }
}
