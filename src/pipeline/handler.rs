//! Terminal request handlers.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::container::{Args, Container, Injectable, ResolveError, TypeKey};
use crate::dispatch::DispatchResult;
use crate::http::{ServerRequest, ServerResponse};
use crate::pipeline::controller::ControllerChain;
use crate::pipeline::middleware::MiddlewareChain;
use crate::routing::Route;

/// Produces the response for a matched route.
///
/// A fresh handler is built for every dispatched request.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle<'a>(&'a self, request: ServerRequest) -> BoxFuture<'a, DispatchResult>;
}

/// Default handler: the route's middleware wrapped around its controllers.
pub struct RouteHandler {
    container: Arc<Container>,
    route: Arc<Route>,
    response: ServerResponse,
}

impl RouteHandler {
    pub fn route(&self) -> &Route {
        &self.route
    }
}

impl Injectable for RouteHandler {
    fn dependencies() -> Vec<TypeKey> {
        vec![
            TypeKey::of::<Container>(),
            TypeKey::of::<Route>(),
            TypeKey::of::<ServerResponse>(),
        ]
    }

    fn construct(args: &mut Args) -> Result<Self, ResolveError> {
        Ok(Self {
            container: args.next()?,
            route: args.next()?,
            response: args.next_owned()?,
        })
    }
}

impl RequestHandler for RouteHandler {
    fn handle<'a>(&'a self, request: ServerRequest) -> BoxFuture<'a, DispatchResult> {
        let controllers = ControllerChain::new(self.container.clone(), self.route.clone(), self.response.clone());
        let chain = MiddlewareChain::new(self.container.clone(), self.route.middlewares(), controllers);
        tracing::debug!(
            route = %self.route.path(),
            middlewares = chain.remaining(),
            controllers = self.route.controllers().len(),
            "Handling request"
        );
        chain.handle(request)
    }
}
