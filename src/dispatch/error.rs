use std::any::Any;
use std::error::Error as StdError;

use thiserror::Error;

use crate::container::ResolveError;
use crate::http::ServerResponse;

/// Result of running a chain link or request handler.
pub type DispatchResult = Result<ServerResponse, DispatchError>;

/// Per-request pipeline failures.
///
/// These never escape `Router::dispatch`; they are logged and the request
/// falls back to the response that existed before the handler ran.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to build pipeline component: {0}")]
    Resolve(#[from] ResolveError),

    #[error("handler failed: {0}")]
    HandlerExecution(Box<dyn StdError + Send + Sync>),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl DispatchError {
    /// Wrap an error raised by handler, middleware or controller code.
    pub fn handler(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        DispatchError::HandlerExecution(error.into())
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        DispatchError::Panicked(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_message() {
        let err = DispatchError::handler("database unavailable");
        assert_eq!(err.to_string(), "handler failed: database unavailable");
    }

    #[test]
    fn test_panic_payloads() {
        let err = DispatchError::from_panic(Box::new("boom"));
        assert_eq!(err.to_string(), "handler panicked: boom");
        let err = DispatchError::from_panic(Box::new(String::from("bang")));
        assert_eq!(err.to_string(), "handler panicked: bang");
        let err = DispatchError::from_panic(Box::new(7u8));
        assert!(matches!(err, DispatchError::Panicked(_)));
    }
}
