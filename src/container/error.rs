//! Resolution errors.

use thiserror::Error;

use crate::container::key::Capability;

/// Errors raised while building instances from the container.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// No constructor and no instance exist for the requested type.
    #[error("no constructor or instance registered for `{type_name}` (alias `{alias}`)")]
    NotFound { type_name: &'static str, alias: String },

    /// A declared parameter could not be auto-resolved and no supplied argument was left.
    #[error("`{target}` parameter #{position} has no resolvable or supplied argument")]
    MissingArgument { target: &'static str, position: usize },

    /// The argument at a position does not have the type the constructor expects.
    #[error("`{target}` parameter #{position} expected `{expected}`")]
    ArgumentType {
        target: &'static str,
        position: usize,
        expected: &'static str,
    },

    /// A constructor dependency chain loops back on itself.
    #[error("dependency cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<&'static str> },

    /// The type is registered but not for the requested capability.
    #[error("`{type_name}` does not implement the {capability} capability")]
    MissingCapability {
        type_name: &'static str,
        capability: Capability,
    },

    /// A stored instance is not of the requested type.
    #[error("instance stored for `{expected}` has a different type")]
    TypeMismatch { expected: &'static str },

    /// The constructor itself reported a failure.
    #[error("constructor for `{target}` failed: {reason}")]
    Construction { target: &'static str, reason: String },
}

impl ResolveError {
    /// Failure reported from inside a constructor for `T`.
    pub fn construction<T: ?Sized>(reason: impl Into<String>) -> Self {
        ResolveError::Construction {
            target: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }
}
