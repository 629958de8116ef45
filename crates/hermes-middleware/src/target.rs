//! Remote targets.
//!
//! A [`RemoteTarget`] is a named, callable endpoint owned by a
//! [`Namespace`](crate::Namespace). It carries its own ordered stage list and
//! a shared reference to the namespace's global stage list.

use crate::middleware::MiddlewareStage;
use std::fmt;
use std::sync::Arc;

/// The namespace-wide list of globally-enabled stages.
///
/// Every target of a namespace holds a clone of the same `Arc`.
pub type GlobalStages = Arc<[Arc<MiddlewareStage>]>;

/// The kind of remote definition a target represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Fire-and-forget call with no meaningful return value.
    Event,
    /// Request/response call whose return value flows back to the caller.
    Function,
}

impl TargetKind {
    /// Returns the kind name used in diagnostic labels.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Event => "Event",
            Self::Function => "Function",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named endpoint subject to middleware processing.
///
/// Immutable once built.
#[derive(Debug)]
pub struct RemoteTarget {
    name: String,
    namespace: Arc<str>,
    kind: TargetKind,
    label: String,
    stages: Vec<Arc<MiddlewareStage>>,
    globals: GlobalStages,
}

impl RemoteTarget {
    /// Starts declaring an event target.
    pub fn event(name: impl Into<String>) -> TargetBuilder {
        TargetBuilder::new(name.into(), TargetKind::Event)
    }

    /// Starts declaring a function target.
    pub fn function(name: impl Into<String>) -> TargetBuilder {
        TargetBuilder::new(name.into(), TargetKind::Function)
    }

    /// Returns the target name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning namespace name.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the target kind.
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Returns the human-readable label used in rejection messages,
    /// e.g. `Function 'Ping'` or `Event 'combat.Hit'`.
    #[must_use]
    pub fn diagnostic_label(&self) -> &str {
        &self.label
    }

    /// Returns the stages bound directly to this target, in declaration order.
    #[must_use]
    pub fn stages(&self) -> &[Arc<MiddlewareStage>] {
        &self.stages
    }

    /// Returns the namespace's global stage list.
    #[must_use]
    pub fn global_stages(&self) -> &[Arc<MiddlewareStage>] {
        &self.globals
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Declaration of a target, completed by
/// [`NamespaceBuilder::build`](crate::NamespaceBuilder::build).
#[derive(Debug)]
pub struct TargetBuilder {
    pub(crate) name: String,
    pub(crate) kind: TargetKind,
    pub(crate) stages: Vec<Arc<MiddlewareStage>>,
}

impl TargetBuilder {
    fn new(name: String, kind: TargetKind) -> Self {
        Self {
            name,
            kind,
            stages: Vec::new(),
        }
    }

    /// Appends a stage to this target's chain.
    #[must_use]
    pub fn middleware(mut self, stage: Arc<MiddlewareStage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends several stages in order.
    #[must_use]
    pub fn middlewares<I>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = Arc<MiddlewareStage>>,
    {
        self.stages.extend(stages);
        self
    }

    pub(crate) fn build(self, namespace: Arc<str>, globals: GlobalStages) -> RemoteTarget {
        let path = if namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{namespace}.{}", self.name)
        };
        RemoteTarget {
            label: format!("{} '{path}'", self.kind),
            name: self.name,
            namespace,
            kind: self.kind,
            stages: self.stages,
            globals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_globals() -> GlobalStages {
        Arc::from(Vec::new())
    }

    #[test]
    fn test_root_namespace_label() {
        let target = RemoteTarget::function("Ping").build(Arc::from(""), no_globals());
        assert_eq!(target.diagnostic_label(), "Function 'Ping'");
        assert_eq!(target.to_string(), "Function 'Ping'");
        assert_eq!(target.namespace(), "");
    }

    #[test]
    fn test_nested_namespace_label() {
        let target = RemoteTarget::event("Hit").build(Arc::from("combat"), no_globals());
        assert_eq!(target.diagnostic_label(), "Event 'combat.Hit'");
        assert_eq!(target.name(), "Hit");
        assert_eq!(target.kind(), TargetKind::Event);
    }

    #[test]
    fn test_stages_keep_declaration_order() {
        let a = MiddlewareStage::builder("a").build();
        let b = MiddlewareStage::builder("b").build();
        let target = RemoteTarget::event("Hit")
            .middleware(Arc::clone(&a))
            .middlewares([Arc::clone(&b)])
            .build(Arc::from(""), no_globals());

        let labels: Vec<_> = target.stages().iter().map(|s| s.label().as_str()).collect();
        assert_eq!(labels, vec!["a", "b"]);
        assert!(target.global_stages().is_empty());
    }
}
