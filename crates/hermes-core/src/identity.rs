//! Caller identity.
//!
//! On the originating side of a call the caller is always the local process,
//! so its identity comes from the [`ExecutionContext`](crate::ExecutionContext).
//! On the delivering side the caller is remote and its identity travels as the
//! first element of the raw argument list.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the party on the other end of a call.
///
/// # Example
///
/// ```
/// use hermes_core::{CallerIdentity, Value};
///
/// let caller = CallerIdentity::remote(Value::from(1001));
/// assert!(caller.is_remote());
/// assert_eq!(caller.log_id(), "remote:1001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", content = "id", rename_all = "snake_case")]
pub enum CallerIdentity {
    /// The local process, known implicitly.
    Local(Value),
    /// A remote caller recovered from the call payload.
    Remote(Value),
}

impl CallerIdentity {
    /// Creates a local identity.
    pub fn local(id: impl Into<Value>) -> Self {
        Self::Local(id.into())
    }

    /// Creates a remote identity.
    pub fn remote(id: impl Into<Value>) -> Self {
        Self::Remote(id.into())
    }

    /// Returns the raw identity value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        match self {
            Self::Local(v) | Self::Remote(v) => v,
        }
    }

    /// Consumes the identity, returning the raw value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Local(v) | Self::Remote(v) => v,
        }
    }

    /// Returns true if the caller was recovered from a remote payload.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Returns a string identifier suitable for logging and rate-limit keys.
    ///
    /// String identities are rendered without quotes.
    #[must_use]
    pub fn log_id(&self) -> String {
        let (prefix, value) = match self {
            Self::Local(v) => ("local", v),
            Self::Remote(v) => ("remote", v),
        };
        match value {
            Value::String(s) => format!("{prefix}:{s}"),
            other => format!("{prefix}:{other}"),
        }
    }
}

impl Default for CallerIdentity {
    fn default() -> Self {
        Self::Local(Value::Null)
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.log_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_local_log_id() {
        let identity = CallerIdentity::local("client");
        assert_eq!(identity.log_id(), "local:client");
        assert!(!identity.is_remote());
    }

    #[test]
    fn test_remote_log_id_number() {
        let identity = CallerIdentity::remote(42);
        assert_eq!(identity.log_id(), "remote:42");
        assert!(identity.is_remote());
    }

    #[test]
    fn test_remote_log_id_object() {
        let identity = CallerIdentity::remote(json!({"user": 7}));
        assert_eq!(identity.log_id(), r#"remote:{"user":7}"#);
    }

    #[test]
    fn test_value_accessors() {
        let identity = CallerIdentity::remote("alice");
        assert_eq!(identity.value(), &json!("alice"));
        assert_eq!(identity.into_value(), json!("alice"));
    }

    #[test]
    fn test_default_is_local_null() {
        assert_eq!(CallerIdentity::default(), CallerIdentity::Local(Value::Null));
    }

    #[test]
    fn test_serde_round_trip_shape() {
        let identity = CallerIdentity::remote(5);
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json, json!({"origin": "remote", "id": 5}));
    }
}
