//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Request dispatch settings.
    pub dispatch: DispatchConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Route table, in registration order.
    pub routes: Vec<RouteConfig>,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Status of the response returned when no route matches.
    pub not_found_status: u16,

    /// Body of the response returned when no route matches.
    pub not_found_body: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            not_found_status: 404,
            not_found_body: "Not Found".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level filter, overridden by `RUST_LOG`.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One route. Types are referenced by their registered names.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteConfig {
    /// Path pattern (`/users/%id/?action`).
    pub path: String,

    /// Request handler type.
    #[serde(default = "default_handler")]
    pub handler: String,

    /// Middleware types, outermost first.
    #[serde(default)]
    pub middlewares: Vec<String>,

    /// Controller types, in execution order.
    #[serde(default)]
    pub controllers: Vec<String>,
}

impl RouteConfig {
    /// Route using the default handler and no middleware or controllers.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            handler: default_handler(),
            middlewares: Vec::new(),
            controllers: Vec::new(),
        }
    }
}

fn default_handler() -> String {
    "RouteHandler".to_string()
}
