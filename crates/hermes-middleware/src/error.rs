//! Build-time configuration errors.
//!
//! These are raised by [`NamespaceBuilder::build`](crate::NamespaceBuilder::build)
//! and are fatal: a namespace that fails to build never serves a call.
//! Runtime failures are [`Rejection`](hermes_core::Rejection)s instead.

use thiserror::Error;

/// Errors detected while building a namespace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A target-scoped stage was placed in a namespace's global list.
    #[error("middleware '{stage}' is not globally enabled and cannot be used globally in namespace '{namespace}'")]
    NotGloballyEnabled {
        /// Label of the offending stage.
        stage: String,
        /// Namespace name.
        namespace: String,
    },

    /// A globally-enabled stage was bound to a target without being
    /// declared in the namespace's global list.
    #[error("middleware '{stage}' used by {target} must be declared globally on its namespace")]
    GlobalStageNotDeclared {
        /// Label of the offending stage.
        stage: String,
        /// Diagnostic label of the target.
        target: String,
    },

    /// Two targets in one namespace share a name.
    #[error("duplicate target '{name}' in namespace '{namespace}'")]
    DuplicateTarget {
        /// Target name.
        name: String,
        /// Namespace name.
        namespace: String,
    },

    /// A target was declared with an empty name.
    #[error("target names must not be empty (namespace '{namespace}')")]
    EmptyName {
        /// Namespace name.
        namespace: String,
    },
}
