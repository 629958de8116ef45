//! Namespaces of remote targets.
//!
//! A [`Namespace`] owns its targets and the global stage list they share.
//! The global list is handed to each target by `Arc` when the namespace is
//! built, and never changes afterwards.
//!
//! # Example
//!
//! ```ignore
//! use hermes_middleware::{Namespace, RemoteTarget, stages::LoggingMiddleware};
//!
//! let logging = LoggingMiddleware::new().into_stage();
//!
//! let combat = Namespace::builder("combat")
//!     .global(logging)
//!     .target(RemoteTarget::event("Hit"))
//!     .target(RemoteTarget::function("Ping"))
//!     .build()?;
//!
//! let ping = combat.target("Ping").unwrap();
//! assert_eq!(ping.diagnostic_label(), "Function 'combat.Ping'");
//! ```

use crate::error::BuildError;
use crate::middleware::MiddlewareStage;
use crate::target::{GlobalStages, RemoteTarget, TargetBuilder};
use indexmap::IndexMap;
use std::sync::Arc;

/// A built, immutable group of targets sharing one global stage list.
#[derive(Debug)]
pub struct Namespace {
    name: Arc<str>,
    globals: GlobalStages,
    targets: IndexMap<String, Arc<RemoteTarget>>,
}

impl Namespace {
    /// Creates a new namespace builder. An empty name denotes the root.
    pub fn builder(name: impl Into<String>) -> NamespaceBuilder {
        NamespaceBuilder::new(name.into())
    }

    /// Returns the namespace name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the global stage list.
    #[must_use]
    pub fn global_stages(&self) -> &[Arc<MiddlewareStage>] {
        &self.globals
    }

    /// Looks up a target by name.
    #[must_use]
    pub fn target(&self, name: &str) -> Option<&Arc<RemoteTarget>> {
        self.targets.get(name)
    }

    /// Iterates targets in declaration order.
    pub fn targets(&self) -> impl Iterator<Item = &Arc<RemoteTarget>> {
        self.targets.values()
    }

    /// Returns the number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true if the namespace has no targets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Builder for [`Namespace`].
#[derive(Debug)]
pub struct NamespaceBuilder {
    name: String,
    globals: Vec<Arc<MiddlewareStage>>,
    targets: Vec<TargetBuilder>,
}

impl NamespaceBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            globals: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Appends a stage to the global list applied after every target's own
    /// stages.
    #[must_use]
    pub fn global(mut self, stage: Arc<MiddlewareStage>) -> Self {
        self.globals.push(stage);
        self
    }

    /// Declares a target.
    #[must_use]
    pub fn target(mut self, target: TargetBuilder) -> Self {
        self.targets.push(target);
        self
    }

    /// Validates the configuration and builds the namespace.
    ///
    /// # Errors
    ///
    /// - [`BuildError::NotGloballyEnabled`] if a global stage is target-scoped
    /// - [`BuildError::GlobalStageNotDeclared`] if a target binds a
    ///   globally-enabled stage the namespace does not declare globally
    /// - [`BuildError::DuplicateTarget`] / [`BuildError::EmptyName`] for bad
    ///   target names
    pub fn build(self) -> Result<Namespace, BuildError> {
        let name: Arc<str> = Arc::from(self.name);

        if let Some(stage) = self.globals.iter().find(|s| !s.is_globally_enabled()) {
            return Err(BuildError::NotGloballyEnabled {
                stage: stage.label().to_string(),
                namespace: name.to_string(),
            });
        }

        let globals: GlobalStages = Arc::from(self.globals);
        let mut targets = IndexMap::with_capacity(self.targets.len());

        for declaration in self.targets {
            if declaration.name.is_empty() {
                return Err(BuildError::EmptyName {
                    namespace: name.to_string(),
                });
            }
            if targets.contains_key(&declaration.name) {
                return Err(BuildError::DuplicateTarget {
                    name: declaration.name,
                    namespace: name.to_string(),
                });
            }

            let target = declaration.build(Arc::clone(&name), Arc::clone(&globals));

            let undeclared = target.stages().iter().find(|stage| {
                stage.is_globally_enabled() && !globals.iter().any(|g| Arc::ptr_eq(g, stage))
            });
            if let Some(stage) = undeclared {
                return Err(BuildError::GlobalStageNotDeclared {
                    stage: stage.label().to_string(),
                    target: target.diagnostic_label().to_string(),
                });
            }

            tracing::debug!(
                target_label = %target.diagnostic_label(),
                stages = target.stages().len(),
                "registered remote target"
            );
            targets.insert(target.name().to_string(), Arc::new(target));
        }

        Ok(Namespace {
            name,
            globals,
            targets,
        })
    }
}
