//! Request dispatch subsystem.
//!
//! # Responsibilities
//! - Own the route registry and the lifecycle listeners
//! - Match each request and run a freshly built handler for it
//! - Contain per-request failures (errors and panics) at the dispatch boundary
//!
//! # Design Decisions
//! - One failing request never affects another: errors are logged, counted,
//!   and the pre-handler response is returned
//! - Hooks are synchronous and receive events by `&mut`
//! - Route stacks are validated at registration, never at dispatch

pub mod error;
pub mod hooks;
pub mod router;

pub use error::{DispatchError, DispatchResult};
pub use hooks::{DispatchListener, PostDispatchEvent, PreDispatchEvent, PreMatchEvent};
pub use router::Router;
