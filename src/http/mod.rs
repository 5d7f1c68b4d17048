//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → request.rs (buffer body into ServerRequest)
//!     → dispatch::Router (hooks, matching, pipeline)
//!     → response.rs (ServerResponse → Axum response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::ServerRequest;
pub use response::ServerResponse;
pub use server::{HttpServer, X_REQUEST_ID};
