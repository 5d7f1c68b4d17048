//! Middleware chain.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::container::{Container, TypeKey};
use crate::dispatch::DispatchResult;
use crate::http::ServerRequest;
use crate::pipeline::controller::ControllerChain;

/// A link that wraps everything after it.
///
/// Implementations are shared across requests and must not keep
/// per-request state in `self`.
pub trait Middleware: Send + Sync + 'static {
    fn process<'a>(&'a self, request: ServerRequest, next: MiddlewareChain) -> BoxFuture<'a, DispatchResult>;
}

/// Remaining middleware for one request, followed by the controller chain.
pub struct MiddlewareChain {
    container: Arc<Container>,
    links: Arc<[TypeKey]>,
    cursor: usize,
    controllers: ControllerChain,
}

impl MiddlewareChain {
    pub fn new(container: Arc<Container>, links: Arc<[TypeKey]>, controllers: ControllerChain) -> Self {
        Self {
            container,
            links,
            cursor: 0,
            controllers,
        }
    }

    /// Middleware not yet run.
    pub fn remaining(&self) -> usize {
        self.links.len().saturating_sub(self.cursor)
    }

    /// Run the link at the cursor, or the controller chain once exhausted.
    pub fn handle(self, request: ServerRequest) -> BoxFuture<'static, DispatchResult> {
        let Some(key) = self.links.get(self.cursor).copied() else {
            return self.controllers.handle(request);
        };
        let next = Self {
            container: self.container.clone(),
            links: self.links,
            cursor: self.cursor + 1,
            controllers: self.controllers,
        };
        let container = self.container;

        Box::pin(async move {
            let middleware = container.middleware(&key)?;
            tracing::debug!(middleware = key.short_name(), "Running middleware");
            middleware.process(request, next).await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use axum::http::{Method, StatusCode, Uri};

    use super::*;
    use crate::http::ServerResponse;
    use crate::routing::Route;

    #[derive(Default)]
    struct Journal {
        entries: Mutex<Vec<&'static str>>,
    }

    impl Journal {
        fn push(&self, entry: &'static str) {
            self.entries.lock().unwrap().push(entry);
        }
    }

    struct Outer(Arc<Journal>);
    struct Inner(Arc<Journal>);

    #[derive(Default)]
    struct Gate {
        calls: AtomicUsize,
    }

    impl Middleware for Outer {
        fn process<'a>(&'a self, request: ServerRequest, next: MiddlewareChain) -> BoxFuture<'a, DispatchResult> {
            Box::pin(async move {
                self.0.push("outer:in");
                let response = next.handle(request).await;
                self.0.push("outer:out");
                response
            })
        }
    }

    impl Middleware for Inner {
        fn process<'a>(&'a self, request: ServerRequest, next: MiddlewareChain) -> BoxFuture<'a, DispatchResult> {
            Box::pin(async move {
                self.0.push("inner:in");
                let response = next.handle(request).await;
                self.0.push("inner:out");
                response
            })
        }
    }

    impl Middleware for Gate {
        fn process<'a>(&'a self, _request: ServerRequest, _next: MiddlewareChain) -> BoxFuture<'a, DispatchResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(ServerResponse::text(StatusCode::FORBIDDEN, "denied")) })
        }
    }

    fn container(journal: Arc<Journal>) -> Arc<Container> {
        let mut container = Container::new();
        let outer = journal.clone();
        container
            .register_factory::<Outer, _>(vec![], move |_| Ok(Outer(outer.clone())))
            .as_middleware();
        container
            .register_factory::<Inner, _>(vec![], move |_| Ok(Inner(journal.clone())))
            .as_middleware();
        container.register_default::<Gate>().as_middleware();
        Arc::new(container)
    }

    fn chain(container: &Arc<Container>, links: Vec<TypeKey>) -> MiddlewareChain {
        let route = Arc::new(Route::new(container, "/", TypeKey::of::<crate::pipeline::RouteHandler>()).unwrap());
        let controllers = ControllerChain::new(container.clone(), route, ServerResponse::text(StatusCode::OK, "end"));
        MiddlewareChain::new(container.clone(), links.into(), controllers)
    }

    fn request() -> ServerRequest {
        ServerRequest::new(Method::GET, Uri::from_static("/"))
    }

    #[tokio::test]
    async fn test_onion_order() {
        let journal = Arc::new(Journal::default());
        let container = container(journal.clone());
        let chain = chain(&container, vec![TypeKey::of::<Outer>(), TypeKey::of::<Inner>()]);

        let response = chain.handle(request()).await.unwrap();
        assert_eq!(response.body_text(), "end");
        assert_eq!(
            *journal.entries.lock().unwrap(),
            vec!["outer:in", "inner:in", "inner:out", "outer:out"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest() {
        let journal = Arc::new(Journal::default());
        let container = container(journal.clone());
        let chain = chain(&container, vec![TypeKey::of::<Gate>(), TypeKey::of::<Outer>()]);

        let response = chain.handle(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(journal.entries.lock().unwrap().is_empty());
        assert_eq!(container.get::<Gate>().unwrap().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_middleware_is_shared_between_requests() {
        let container = container(Arc::new(Journal::default()));
        for _ in 0..2 {
            chain(&container, vec![TypeKey::of::<Gate>()])
                .handle(request())
                .await
                .unwrap();
        }
        assert_eq!(container.get::<Gate>().unwrap().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_chain_runs_controllers() {
        let container = container(Arc::new(Journal::default()));
        let chain = chain(&container, vec![]);
        assert_eq!(chain.remaining(), 0);
        let response = chain.handle(request()).await.unwrap();
        assert_eq!(response.body_text(), "end");
    }
}
