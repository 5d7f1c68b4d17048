//! Route entity.

use std::sync::Arc;

use crate::container::{Capability, Container, TypeKey};
use crate::routing::error::RouteError;
use crate::routing::matcher::PathPattern;

/// A path pattern bound to a handler plus its middleware and controller stacks.
///
/// Stacks are immutable slices: clones share them, and every change swaps
/// in a new slice, so a clone taken for a request never observes later edits.
#[derive(Debug, Clone)]
pub struct Route {
    pattern: PathPattern,
    handler: TypeKey,
    middlewares: Arc<[TypeKey]>,
    controllers: Arc<[TypeKey]>,
}

impl Route {
    /// Route for `path` handled by `handler`, which must be registered as a handler.
    pub fn new(container: &Container, path: &str, handler: TypeKey) -> Result<Self, RouteError> {
        let pattern = PathPattern::parse(path)?;
        check(container, path, &handler, Capability::Handler)?;
        Ok(Self {
            pattern,
            handler,
            middlewares: Arc::from(Vec::new()),
            controllers: Arc::from(Vec::new()),
        })
    }

    pub fn path(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn handler(&self) -> TypeKey {
        self.handler
    }

    pub fn middlewares(&self) -> Arc<[TypeKey]> {
        self.middlewares.clone()
    }

    pub fn controllers(&self) -> Arc<[TypeKey]> {
        self.controllers.clone()
    }

    /// Replace the handler; the route is unchanged if `handler` lacks the capability.
    pub fn set_handler(&mut self, container: &Container, handler: TypeKey) -> Result<(), RouteError> {
        check(container, self.path(), &handler, Capability::Handler)?;
        self.handler = handler;
        Ok(())
    }

    /// Append middleware; nothing is added unless every item is a middleware.
    pub fn add_middlewares(
        &mut self,
        container: &Container,
        items: impl IntoIterator<Item = TypeKey>,
    ) -> Result<(), RouteError> {
        self.middlewares = self.extended(container, &self.middlewares, items, Capability::Middleware)?;
        Ok(())
    }

    /// Append controllers; nothing is added unless every item is a controller.
    pub fn add_controllers(
        &mut self,
        container: &Container,
        items: impl IntoIterator<Item = TypeKey>,
    ) -> Result<(), RouteError> {
        self.controllers = self.extended(container, &self.controllers, items, Capability::Controller)?;
        Ok(())
    }

    /// Replace the middleware stack; the old stack stays if any item is invalid.
    pub fn set_middleware_stack(
        &mut self,
        container: &Container,
        items: impl IntoIterator<Item = TypeKey>,
    ) -> Result<(), RouteError> {
        self.middlewares = self.extended(container, &[], items, Capability::Middleware)?;
        Ok(())
    }

    /// Replace the controller stack; the old stack stays if any item is invalid.
    pub fn set_controller_stack(
        &mut self,
        container: &Container,
        items: impl IntoIterator<Item = TypeKey>,
    ) -> Result<(), RouteError> {
        self.controllers = self.extended(container, &[], items, Capability::Controller)?;
        Ok(())
    }

    fn extended(
        &self,
        container: &Container,
        current: &[TypeKey],
        items: impl IntoIterator<Item = TypeKey>,
        capability: Capability,
    ) -> Result<Arc<[TypeKey]>, RouteError> {
        let mut stack = current.to_vec();
        for item in items {
            check(container, self.path(), &item, capability)?;
            stack.push(item);
        }
        Ok(stack.into())
    }
}

impl AsRef<PathPattern> for Route {
    fn as_ref(&self) -> &PathPattern {
        &self.pattern
    }
}

fn check(container: &Container, route: &str, key: &TypeKey, capability: Capability) -> Result<(), RouteError> {
    if container.implements(key, capability) {
        return Ok(());
    }
    Err(RouteError::InvalidArgument {
        route: route.to_string(),
        type_name: key.name(),
        capability,
    })
}
