//! Dependency container subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Container::register::<T>()     (factory table: TypeKey → constructor + declared deps)
//!     → Registration::as_middleware / as_controller / as_handler (capabilities)
//!     → Arc<Container> shared by the router and every chain
//!
//! Per request:
//!     resolve(key, options)
//!     → resolver.rs (claim supplied objects, walk declared deps, recurse)
//!     → constructor factory(Args)
//!     → instance cache (cached mode only)
//! ```
//!
//! # Design Decisions
//! - Constructors are declared at registration time instead of discovered
//! - One cached instance per (type, alias); `set` always overwrites
//! - Transient resolution builds only the target fresh; dependencies come from the cache
//! - Supplied objects are claimed by exact type only
//! - Dependency cycles fail with `ResolveError::Cycle`

pub mod args;
pub mod error;
pub mod key;
pub mod registry;
pub mod resolver;

pub use args::{Args, Argument, Instance};
pub use error::ResolveError;
pub use key::{Capability, TypeKey};
pub use registry::{Container, Injectable, Registration, DEFAULT_ALIAS};
pub use resolver::ResolveOptions;
