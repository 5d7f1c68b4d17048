//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, status codes, addresses)
//! - Check route patterns parse and are not registered twice
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Type names are resolved later against the container, not here

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use axum::http::StatusCode;

use crate::config::schema::AppConfig;
use crate::routing::PathPattern;

/// A single failed check, with the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check `config`, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("server.bind_address", "not a socket address"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be greater than 0"));
    }
    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::new("server.max_body_bytes", "must be greater than 0"));
    }
    if StatusCode::from_u16(config.dispatch.not_found_status).is_err() {
        errors.push(ValidationError::new("dispatch.not_found_status", "not an HTTP status code"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{index}]");
        if let Err(err) = PathPattern::parse(&route.path) {
            errors.push(ValidationError::new(format!("{field}.path"), err.to_string()));
        }
        if !seen.insert(route.path.as_str()) {
            errors.push(ValidationError::new(
                format!("{field}.path"),
                format!("'{}' is already defined", route.path),
            ));
        }
        if route.handler.trim().is_empty() {
            errors.push(ValidationError::new(format!("{field}.handler"), "must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.server.bind_address = "nowhere".to_string();
        config.server.request_timeout_secs = 0;
        config.dispatch.not_found_status = 42;
        config.routes.push(RouteConfig::new("/a"));
        config.routes.push(RouteConfig::new("/a"));
        config.routes.push(RouteConfig::new("/b/%"));

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|err| err.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "server.bind_address",
                "server.request_timeout_secs",
                "dispatch.not_found_status",
                "routes[1].path",
                "routes[2].path",
            ]
        );
    }
}
