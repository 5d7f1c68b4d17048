//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     register_route(path, handler)
//!     → matcher.rs (parse pattern into segments)
//!     → route.rs (validate handler/middleware/controller capabilities)
//!     → registry.rs (publish new table snapshot)
//!
//! Per request:
//!     request path
//!     → registry.rs (load snapshot)
//!     → matcher.rs (score all patterns, pick best, extract variables)
//!     → matched Route or None
//! ```
//!
//! # Design Decisions
//! - Registration validates everything up front; routes are never half-registered
//! - Matching is a linear scan over all patterns (no regex)
//! - Deterministic: same table and path always pick the same route

pub mod error;
pub mod matcher;
pub mod registry;
pub mod route;

pub use error::RouteError;
pub use matcher::{extract_path_variables, find_best_match, PathPattern, PathVariables, Segment};
pub use registry::RouteRegistry;
pub use route::Route;
