use thiserror::Error;

use crate::container::Capability;

/// Route registration and lookup failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route '{route}': {type_name} is not registered as a {capability}")]
    InvalidArgument {
        route: String,
        type_name: &'static str,
        capability: Capability,
    },

    #[error("no route registered for '{0}'")]
    NotFound(String),

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
