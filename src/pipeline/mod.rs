//! Per-request execution pipeline.
//!
//! # Data Flow
//! ```text
//! Router::dispatch
//!     │
//!     ▼
//! RouteHandler::handle(request)
//!     │
//!     ▼
//! MiddlewareChain ── M1 ─▶ M2 ─▶ ... ─▶ (exhausted)
//!                                          │
//!                                          ▼
//!                               ControllerChain ── C1 ─▶ C2 ─▶ ... ─▶ response
//! ```
//!
//! # Design Decisions
//! - Chains are single-use values: an `Arc<[TypeKey]>` of links plus a cursor
//! - A link delegates by calling `handle` on the advanced chain it was given;
//!   dropping the chain instead short-circuits
//! - Middleware come from the instance cache; controllers and handlers are
//!   built fresh for every request

pub mod controller;
pub mod handler;
pub mod middleware;

pub use controller::{Controller, ControllerBase, ControllerChain};
pub use handler::{RequestHandler, RouteHandler};
pub use middleware::{Middleware, MiddlewareChain};
