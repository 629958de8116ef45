//! Execution context types.
//!
//! The [`ExecutionContext`] tells the engine which side of the transport it
//! runs on. It is passed explicitly when adapters are constructed rather
//! than looked up from ambient state.

use crate::identity::CallerIdentity;
use crate::value::Args;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A unique identifier for each middleware chain run, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines for one call easy to
/// correlate.
///
/// # Example
///
/// ```
/// use hermes_core::CallId;
///
/// let id = CallId::new();
/// println!("Call ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(Uuid);

impl CallId {
    /// Creates a new unique call ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The direction a middleware chain runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Outbound, before the transport sends the call.
    Send,
    /// Inbound, before the call is delivered to the real callback.
    Recv,
}

impl Direction {
    /// Returns the direction name used in logs and metric labels.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Recv => "recv",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which side of the transport an adapter executes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The side that originates calls on behalf of a single local identity.
    /// Raw argument lists carry no identity.
    Origin,
    /// The side that serves many remote peers. The peer's identity is the
    /// first element of every raw argument list.
    Delivery,
}

/// What the engine does when a stage accepts without supplying arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingArguments {
    /// Continue with an empty argument list.
    #[default]
    Empty,
    /// Continue with the arguments the stage was given.
    Preserve,
}

/// Identifies the role an adapter plays and the local identity it acts as.
///
/// # Example
///
/// ```
/// use hermes_core::{CallerIdentity, ExecutionContext, Value};
///
/// let ctx = ExecutionContext::delivery();
/// let (caller, rest) = ctx.split_caller(vec![Value::from(7), Value::from("hi")]).unwrap();
/// assert_eq!(caller, CallerIdentity::remote(7));
/// assert_eq!(rest, vec![Value::from("hi")]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    side: Side,
    local_identity: CallerIdentity,
}

impl ExecutionContext {
    /// Creates an originating-side context acting as `identity`.
    #[must_use]
    pub fn origin(identity: CallerIdentity) -> Self {
        Self {
            side: Side::Origin,
            local_identity: identity,
        }
    }

    /// Creates a delivering-side context.
    #[must_use]
    pub fn delivery() -> Self {
        Self {
            side: Side::Delivery,
            local_identity: CallerIdentity::default(),
        }
    }

    /// Returns the side this context executes on.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Returns the identity used on the originating side.
    #[must_use]
    pub const fn local_identity(&self) -> &CallerIdentity {
        &self.local_identity
    }

    /// Returns true on the delivering side.
    #[must_use]
    pub const fn is_delivery(&self) -> bool {
        matches!(self.side, Side::Delivery)
    }

    /// Separates the caller identity from a raw argument list.
    ///
    /// On the delivering side the first argument is removed and returned as
    /// a [`CallerIdentity::Remote`]; `None` is returned if the list is empty.
    /// On the originating side the list is returned untouched alongside the
    /// local identity.
    #[must_use]
    pub fn split_caller(&self, mut raw: Args) -> Option<(CallerIdentity, Args)> {
        match self.side {
            Side::Origin => Some((self.local_identity.clone(), raw)),
            Side::Delivery => {
                if raw.is_empty() {
                    return None;
                }
                let caller = raw.remove(0);
                Some((CallerIdentity::Remote(caller), raw))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_id_unique() {
        assert_ne!(CallId::new(), CallId::new());
    }

    #[test]
    fn test_call_id_display_is_uuid() {
        let id = CallId::new();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }

    #[test]
    fn test_direction_names() {
        assert_eq!(Direction::Send.to_string(), "send");
        assert_eq!(Direction::Recv.to_string(), "recv");
    }

    #[test]
    fn test_origin_split_keeps_arguments() {
        let ctx = ExecutionContext::origin(CallerIdentity::local("me"));
        let (caller, args) = ctx.split_caller(vec![json!(1), json!(2)]).unwrap();
        assert_eq!(caller, CallerIdentity::local("me"));
        assert_eq!(args, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_origin_split_accepts_empty() {
        let ctx = ExecutionContext::origin(CallerIdentity::local("me"));
        let (_, args) = ctx.split_caller(Vec::new()).unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn test_delivery_split_removes_first() {
        let ctx = ExecutionContext::delivery();
        let (caller, args) = ctx.split_caller(vec![json!("peer"), json!(42)]).unwrap();
        assert_eq!(caller, CallerIdentity::remote("peer"));
        assert_eq!(args, vec![json!(42)]);
        assert!(ctx.is_delivery());
    }

    #[test]
    fn test_delivery_split_empty_is_none() {
        let ctx = ExecutionContext::delivery();
        assert!(ctx.split_caller(Vec::new()).is_none());
    }

    #[test]
    fn test_missing_arguments_default() {
        assert_eq!(MissingArguments::default(), MissingArguments::Empty);
        let parsed: MissingArguments = serde_json::from_str(r#""preserve""#).unwrap();
        assert_eq!(parsed, MissingArguments::Preserve);
    }
}
