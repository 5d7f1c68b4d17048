//! Built-in pipeline components.
//!
//! Registered under short names so route tables in configuration can use
//! them directly:
//!
//! | name              | type             | capability |
//! |-------------------|------------------|------------|
//! | `access_log`      | `AccessLog`      | middleware |
//! | `request_context` | `RequestContext` | middleware |
//! | `echo`            | `Echo`           | controller |

pub mod access_log;
pub mod context;
pub mod echo;

pub use access_log::AccessLog;
pub use context::RequestContext;
pub use echo::Echo;

use crate::container::Container;

/// Register every built-in component.
pub fn register_builtins(container: &mut Container) {
    container.register_default::<AccessLog>().as_middleware().named("access_log");
    container
        .register_default::<RequestContext>()
        .as_middleware()
        .named("request_context");
    container.register_default::<Echo>().as_controller().named("echo");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Capability, TypeKey};

    #[test]
    fn test_builtins_are_named() {
        let mut container = Container::new();
        register_builtins(&mut container);

        let access_log = container.lookup("access_log").unwrap();
        assert_eq!(access_log, TypeKey::of::<AccessLog>());
        assert!(container.implements(&access_log, Capability::Middleware));

        let echo = container.lookup("echo").unwrap();
        assert!(container.implements(&echo, Capability::Controller));
        assert_eq!(container.lookup("RouteHandler"), Some(TypeKey::of::<crate::pipeline::RouteHandler>()));
    }
}
