//! Request dispatch core: route matching, dependency resolution and
//! middleware/controller pipelines behind an Axum front end.

// Core subsystems
pub mod container;
pub mod dispatch;
pub mod pipeline;
pub mod routing;

// Built-in pipeline components
pub mod components;

// Server plumbing
pub mod config;
pub mod http;

// Operations
pub mod lifecycle;
pub mod observability;

pub use config::schema::AppConfig;
pub use container::{Argument, Container, Injectable, TypeKey};
pub use dispatch::{DispatchError, DispatchListener, Router};
pub use http::{HttpServer, ServerRequest, ServerResponse};
pub use lifecycle::Shutdown;
