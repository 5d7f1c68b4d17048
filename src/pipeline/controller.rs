//! Controller chain and the per-link controller base.
//!
//! # Data Flow
//! ```text
//! ControllerChain::handle(request)
//!     │
//!     ├─ exhausted ──────────────▶ Ok(response)
//!     │
//!     ├─ 1. make ControllerBase { route, request, response, rest-of-chain }
//!     ├─ 2. make controller (its own dependencies, transient)
//!     └─ 3. controller.process(base)
//!                 │
//!                 └─ base.next() ──▶ rest-of-chain.handle(...)
//! ```

use std::sync::Arc;

use futures_util::future::{self, BoxFuture};

use crate::container::{Args, Argument, Container, Injectable, ResolveError, TypeKey};
use crate::dispatch::DispatchResult;
use crate::http::{ServerRequest, ServerResponse};
use crate::routing::Route;

/// A link that contributes to the response in list order.
pub trait Controller: Send + Sync + 'static {
    fn process<'a>(&'a self, base: ControllerBase) -> BoxFuture<'a, DispatchResult>;
}

/// Remaining controllers for one request and the response built so far.
#[derive(Clone)]
pub struct ControllerChain {
    container: Arc<Container>,
    route: Arc<Route>,
    links: Arc<[TypeKey]>,
    cursor: usize,
    response: ServerResponse,
}

impl ControllerChain {
    /// Chain over `route`'s controllers, starting from `response`.
    pub fn new(container: Arc<Container>, route: Arc<Route>, response: ServerResponse) -> Self {
        let links = route.controllers();
        Self {
            container,
            route,
            links,
            cursor: 0,
            response,
        }
    }

    /// Same position in the chain, carrying a different response.
    pub fn with_response(mut self, response: ServerResponse) -> Self {
        self.response = response;
        self
    }

    pub fn response(&self) -> &ServerResponse {
        &self.response
    }

    /// Controllers not yet run.
    pub fn remaining(&self) -> usize {
        self.links.len().saturating_sub(self.cursor)
    }

    /// Run the controller at the cursor; an exhausted chain yields its response.
    pub fn handle(self, request: ServerRequest) -> BoxFuture<'static, DispatchResult> {
        let Some(key) = self.links.get(self.cursor).copied() else {
            return Box::pin(future::ready(Ok(self.response)));
        };

        let Self {
            container,
            route,
            links,
            cursor,
            response,
        } = self;
        let rest = Self {
            container: container.clone(),
            route: route.clone(),
            links,
            cursor: cursor + 1,
            response: ServerResponse::default(),
        };

        Box::pin(async move {
            let base = container.make_owned::<ControllerBase>(vec![
                Argument::object(route),
                Argument::object(Arc::new(request)),
                Argument::object(Arc::new(response)),
                Argument::object(Arc::new(rest)),
            ])?;
            let controller = container.controller(&key)?;
            tracing::debug!(controller = key.short_name(), "Running controller");
            controller.process(base).await
        })
    }
}

/// State handed to every controller: the route, the request, the response
/// so far, and the rest of the chain.
#[derive(Clone)]
pub struct ControllerBase {
    pub route: Arc<Route>,
    pub request: ServerRequest,
    pub response: ServerResponse,
    chain: ControllerChain,
}

impl Injectable for ControllerBase {
    fn dependencies() -> Vec<TypeKey> {
        vec![
            TypeKey::of::<Route>(),
            TypeKey::of::<ServerRequest>(),
            TypeKey::of::<ServerResponse>(),
            TypeKey::of::<ControllerChain>(),
        ]
    }

    fn construct(args: &mut Args) -> Result<Self, ResolveError> {
        Ok(Self {
            route: args.next()?,
            request: args.next_owned()?,
            response: args.next_owned()?,
            chain: args.next_owned()?,
        })
    }
}

impl ControllerBase {
    /// Continue with the remaining controllers using this base's request and response.
    pub fn next(self) -> BoxFuture<'static, DispatchResult> {
        self.chain.with_response(self.response).handle(self.request)
    }

    /// Stop the chain here and answer with this base's response.
    pub fn respond(self) -> DispatchResult {
        Ok(self.response)
    }

    /// Controllers still queued after this one.
    pub fn remaining(&self) -> usize {
        self.chain.remaining()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode, Uri};

    use super::*;
    use crate::pipeline::RouteHandler;

    #[derive(Default)]
    struct First;

    #[derive(Default)]
    struct Second;

    #[derive(Default)]
    struct Finish;

    struct Greeting(String);

    struct Greeter {
        greeting: Arc<Greeting>,
    }

    impl Controller for First {
        fn process<'a>(&'a self, mut base: ControllerBase) -> BoxFuture<'a, DispatchResult> {
            base.response.write("first;");
            base.next()
        }
    }

    impl Controller for Second {
        fn process<'a>(&'a self, mut base: ControllerBase) -> BoxFuture<'a, DispatchResult> {
            base.response.set_status(StatusCode::OK);
            base.response.write("second;");
            base.next()
        }
    }

    impl Controller for Finish {
        fn process<'a>(&'a self, mut base: ControllerBase) -> BoxFuture<'a, DispatchResult> {
            base.response.write("finish;");
            Box::pin(future::ready(base.respond()))
        }
    }

    impl Injectable for Greeter {
        fn dependencies() -> Vec<TypeKey> {
            vec![TypeKey::of::<Greeting>()]
        }

        fn construct(args: &mut Args) -> Result<Self, ResolveError> {
            Ok(Self { greeting: args.next()? })
        }
    }

    impl Controller for Greeter {
        fn process<'a>(&'a self, mut base: ControllerBase) -> BoxFuture<'a, DispatchResult> {
            let name = base.request.path_variable("name").unwrap_or("world").to_string();
            base.response.write(format!("{}, {name}", self.greeting.0));
            base.next()
        }
    }

    fn container() -> Arc<Container> {
        let mut container = Container::new();
        container.register_default::<First>().as_controller();
        container.register_default::<Second>().as_controller();
        container.register_default::<Finish>().as_controller();
        container.register::<Greeter>().as_controller();
        container.set(Arc::new(Greeting("hello".to_string())));
        Arc::new(container)
    }

    fn chain(container: &Arc<Container>, controllers: Vec<TypeKey>) -> ControllerChain {
        let mut route = Route::new(container, "/", TypeKey::of::<RouteHandler>()).unwrap();
        route.set_controller_stack(container, controllers).unwrap();
        ControllerChain::new(
            container.clone(),
            Arc::new(route),
            ServerResponse::new(StatusCode::NOT_FOUND),
        )
    }

    fn request() -> ServerRequest {
        ServerRequest::new(Method::GET, Uri::from_static("/"))
    }

    #[tokio::test]
    async fn test_controllers_write_in_order() {
        let container = container();
        let chain = chain(&container, vec![TypeKey::of::<First>(), TypeKey::of::<Second>()]);

        let response = chain.handle(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body_text(), "first;second;");
    }

    #[tokio::test]
    async fn test_respond_stops_chain() {
        let container = container();
        let chain = chain(
            &container,
            vec![TypeKey::of::<First>(), TypeKey::of::<Finish>(), TypeKey::of::<Second>()],
        );

        let response = chain.handle(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_text(), "first;finish;");
    }

    #[tokio::test]
    async fn test_controller_receives_own_dependencies() {
        let container = container();
        let chain = chain(&container, vec![TypeKey::of::<Greeter>()]);

        let response = chain.handle(request()).await.unwrap();
        assert_eq!(response.body_text(), "hello, world");
    }

    #[tokio::test]
    async fn test_empty_chain_returns_response_unchanged() {
        let container = container();
        let chain = chain(&container, vec![]);
        assert_eq!(chain.remaining(), 0);

        let response = chain.handle(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.body().is_empty());
    }
}
