//! Request dispatcher.
//!
//! # Data Flow
//! ```text
//! ServerRequest
//!     → pre_match listeners            (may replace request/response, or stop)
//!     → RouteRegistry::find            (best match over the current snapshot)
//!         ├─ none    → not-found response
//!         └─ matched → working copy of the route
//!                    → path variables attached to the request
//!                    → pre_dispatch listeners (may replace route, or stop)
//!                    → fresh handler (transient) → handle(request)
//!                      (starts from a clean 200 response unless a listener replaced it)
//!                    → failure or panic: keep the pre-handler response
//!     → post_dispatch listeners        (may replace the final response)
//!     → ServerResponse
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use futures_util::FutureExt;

use crate::config::{ConfigError, DispatchConfig, RouteConfig};
use crate::container::{Argument, Capability, Container, TypeKey};
use crate::dispatch::error::{DispatchError, DispatchResult};
use crate::dispatch::hooks::{emit, DispatchListener, PostDispatchEvent, PreDispatchEvent, PreMatchEvent};
use crate::http::{ServerRequest, ServerResponse};
use crate::observability::metrics;
use crate::routing::{extract_path_variables, Route, RouteError, RouteRegistry};

/// Matches requests to routes and runs their handlers.
pub struct Router {
    container: Arc<Container>,
    routes: RouteRegistry,
    listeners: Vec<Arc<dyn DispatchListener>>,
    config: DispatchConfig,
}

impl Router {
    pub fn new(container: Arc<Container>) -> Self {
        Self::with_config(container, DispatchConfig::default())
    }

    pub fn with_config(container: Arc<Container>, config: DispatchConfig) -> Self {
        Self {
            container,
            routes: RouteRegistry::new(),
            listeners: Vec::new(),
            config,
        }
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn routes(&self) -> &RouteRegistry {
        &self.routes
    }

    /// Append a lifecycle listener; listeners run in the order added.
    pub fn add_listener(&mut self, listener: impl DispatchListener) {
        self.listeners.push(Arc::new(listener));
    }

    /// Register `handler` for `path`, replacing any route with the same path.
    pub fn register_route(&self, path: &str, handler: TypeKey) -> Result<Arc<Route>, RouteError> {
        let route = Route::new(&self.container, path, handler)?;
        Ok(self.register(route))
    }

    /// Register a fully configured route.
    pub fn register(&self, route: Route) -> Arc<Route> {
        let route = self.routes.insert(route);
        metrics::record_route_count(self.routes.len());
        route
    }

    /// Modify the route for `path` through `change`; on error the route is unchanged.
    pub fn update_route<F>(&self, path: &str, change: F) -> Result<Arc<Route>, RouteError>
    where
        F: FnOnce(&Container, &mut Route) -> Result<(), RouteError>,
    {
        let container: &Container = &self.container;
        self.routes.update(path, |route| change(container, route))
    }

    /// Remove the route for `path`, if any.
    pub fn unregister_route(&self, path: &str) {
        if self.routes.remove(path).is_some() {
            metrics::record_route_count(self.routes.len());
        }
    }

    pub fn get_route(&self, path: &str) -> Option<Arc<Route>> {
        self.routes.get(path)
    }

    /// Registered paths in registration order.
    pub fn list_routes(&self) -> Vec<String> {
        self.routes.paths()
    }

    /// Build routes from configuration, resolving type names through the container.
    pub fn build_routes(&self, configs: &[RouteConfig]) -> Result<Vec<Route>, ConfigError> {
        configs.iter().map(|config| self.build_route(config)).collect()
    }

    /// Replace the route table with `configs`. Nothing changes unless every route builds.
    pub fn load_routes(&self, configs: &[RouteConfig]) -> Result<usize, ConfigError> {
        let routes = self.build_routes(configs)?;
        let count = routes.len();
        self.routes.replace_all(routes);
        metrics::record_route_count(count);
        Ok(count)
    }

    fn build_route(&self, config: &RouteConfig) -> Result<Route, ConfigError> {
        let lookup = |name: &str, capability: Capability| {
            self.container.lookup(name).ok_or_else(|| ConfigError::UnknownType {
                route: config.path.clone(),
                name: name.to_string(),
                capability,
            })
        };

        let handler = lookup(&config.handler, Capability::Handler)?;
        let middlewares = config
            .middlewares
            .iter()
            .map(|name| lookup(name, Capability::Middleware))
            .collect::<Result<Vec<_>, _>>()?;
        let controllers = config
            .controllers
            .iter()
            .map(|name| lookup(name, Capability::Controller))
            .collect::<Result<Vec<_>, _>>()?;

        let mut route = Route::new(&self.container, &config.path, handler)?;
        route.add_middlewares(&self.container, middlewares)?;
        route.add_controllers(&self.container, controllers)?;
        Ok(route)
    }

    /// Response used when nothing matches.
    pub fn not_found(&self) -> ServerResponse {
        let status = StatusCode::from_u16(self.config.not_found_status).unwrap_or(StatusCode::NOT_FOUND);
        ServerResponse::text(status, self.config.not_found_body.clone())
    }

    /// Run one request through hooks, matching and the matched route's handler.
    ///
    /// Never fails: pipeline errors degrade to the response that existed
    /// before the handler ran.
    pub async fn dispatch(&self, request: ServerRequest) -> ServerResponse {
        let started = Instant::now();

        let not_found = self.not_found();
        let mut event = PreMatchEvent::new(request, not_found.clone());
        emit(
            &self.listeners,
            &mut event,
            |listener, event| listener.pre_match(event),
            PreMatchEvent::is_propagation_stopped,
        );
        let stopped = event.is_propagation_stopped();
        let PreMatchEvent { request, response, .. } = event;

        let matched = if stopped {
            tracing::debug!(path = %request.path(), "Dispatch stopped before matching");
            None
        } else {
            self.routes.find(request.path())
        };

        let (request, response, route) = match matched {
            Some(registered) => {
                let (request, response, route) = self.dispatch_matched(&registered, request, response, &not_found).await;
                (request, response, Some(route))
            }
            None => {
                if !stopped {
                    tracing::debug!(method = %request.method(), path = %request.path(), "No route matched");
                }
                (request, response, None)
            }
        };

        let mut event = PostDispatchEvent::new(request, response, route);
        emit(
            &self.listeners,
            &mut event,
            |listener, event| listener.post_dispatch(event),
            PostDispatchEvent::is_propagation_stopped,
        );

        let label = event.route.as_ref().map_or("none", |route| route.path());
        metrics::record_dispatch(label, event.response.status().as_u16(), started);
        event.response
    }

    async fn dispatch_matched(
        &self,
        registered: &Route,
        request: ServerRequest,
        response: ServerResponse,
        not_found: &ServerResponse,
    ) -> (ServerRequest, ServerResponse, Arc<Route>) {
        // Request-local copy: hooks may replace it without touching the registry.
        let route = Arc::new(registered.clone());
        let variables = extract_path_variables(request.path(), route.pattern());
        tracing::debug!(
            route = %route.path(),
            path = %request.path(),
            variables = variables.len(),
            "Route matched"
        );
        let request = request.with_path_variables(variables);

        let mut event = PreDispatchEvent::new(request, response, route);
        emit(
            &self.listeners,
            &mut event,
            |listener, event| listener.pre_dispatch(event),
            PreDispatchEvent::is_propagation_stopped,
        );
        let stopped = event.is_propagation_stopped();
        let PreDispatchEvent {
            mut request,
            response,
            route,
            ..
        } = event;

        if route.path() != registered.path() {
            let variables = extract_path_variables(request.path(), route.pattern());
            tracing::debug!(route = %route.path(), "Route replaced before handler, variables re-extracted");
            request = request.with_path_variables(variables);
        }

        if stopped {
            tracing::debug!(route = %route.path(), "Dispatch stopped before handler");
            return (request, response, route);
        }

        // The handler builds on a clean response unless a listener supplied one.
        let initial = if response == *not_found {
            ServerResponse::default()
        } else {
            response.clone()
        };
        let fallback = response;
        let outcome = AssertUnwindSafe(self.run_handler(route.clone(), request.clone(), initial))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(DispatchError::from_panic(payload)));

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    route = %route.path(),
                    handler = route.handler().short_name(),
                    error = %err,
                    "Request handler failed, keeping previous response"
                );
                metrics::record_handler_failure(route.path());
                fallback
            }
        };
        (request, response, route)
    }

    async fn run_handler(&self, route: Arc<Route>, request: ServerRequest, response: ServerResponse) -> DispatchResult {
        let handler = self.container.handler(
            &route.handler(),
            vec![
                Argument::object(self.container.clone()),
                Argument::object(route),
                Argument::object(Arc::new(response)),
            ],
        )?;
        handler.handle(request).await
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::{Method, Uri};
    use futures_util::future::{self, BoxFuture};

    use super::*;
    use crate::pipeline::{Controller, ControllerBase, RouteHandler};

    #[derive(Default)]
    struct Show;

    impl Controller for Show {
        fn process<'a>(&'a self, mut base: ControllerBase) -> BoxFuture<'a, DispatchResult> {
            let id = base.request.path_variable("id").unwrap_or("-").to_string();
            base.response.set_status(StatusCode::OK);
            base.response.write(format!("show {id}"));
            base.next()
        }
    }

    #[derive(Default)]
    struct Fail;

    impl Controller for Fail {
        fn process<'a>(&'a self, _base: ControllerBase) -> BoxFuture<'a, DispatchResult> {
            Box::pin(future::ready(Err(DispatchError::handler("exploded"))))
        }
    }

    #[derive(Default)]
    struct Counter {
        pre_match: AtomicUsize,
        post_dispatch: AtomicUsize,
    }

    struct Counting(Arc<Counter>);

    impl DispatchListener for Counting {
        fn pre_match(&self, _event: &mut PreMatchEvent) {
            self.0.pre_match.fetch_add(1, Ordering::SeqCst);
        }

        fn post_dispatch(&self, _event: &mut PostDispatchEvent) {
            self.0.post_dispatch.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn router() -> Router {
        let mut container = Container::new();
        container.register_default::<Show>().as_controller().named("show");
        container.register_default::<Fail>().as_controller().named("fail");
        Router::new(Arc::new(container))
    }

    fn get(path: &'static str) -> ServerRequest {
        ServerRequest::new(Method::GET, Uri::from_static(path))
    }

    #[tokio::test]
    async fn test_matched_route_runs_controllers() {
        let router = router();
        let err = router.update_route("/users/%id", |_, _| Ok(())).unwrap_err();
        assert_eq!(err, RouteError::NotFound("/users/%id".to_string()));
        router.register_route("/users/%id", TypeKey::of::<RouteHandler>()).unwrap();
        router
            .update_route("/users/%id", |container, route| {
                route.add_controllers(container, [TypeKey::of::<Show>()])
            })
            .unwrap();

        let response = router.dispatch(get("/users/42")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body_text(), "show 42");
    }

    struct Seed;

    impl DispatchListener for Seed {
        fn pre_dispatch(&self, event: &mut PreDispatchEvent) {
            if event.request.path().starts_with("/seeded") {
                event.response = ServerResponse::new(StatusCode::ACCEPTED).with_header(
                    axum::http::header::HeaderName::from_static("x-seed"),
                    axum::http::HeaderValue::from_static("1"),
                );
            }
        }
    }

    #[tokio::test]
    async fn test_handler_starts_from_clean_or_listener_response() {
        let mut router = router();
        router
            .load_routes(&[
                RouteConfig {
                    path: "/plain/%id".to_string(),
                    handler: "RouteHandler".to_string(),
                    middlewares: vec![],
                    controllers: vec!["show".to_string()],
                },
                RouteConfig {
                    path: "/seeded/%id".to_string(),
                    handler: "RouteHandler".to_string(),
                    middlewares: vec![],
                    controllers: vec!["show".to_string()],
                },
            ])
            .unwrap();
        router.add_listener(Seed);

        let response = router.dispatch(get("/plain/1")).await;
        assert_eq!(response.body_text(), "show 1");
        assert!(response.headers().is_empty());

        let response = router.dispatch(get("/seeded/2")).await;
        assert_eq!(response.body_text(), "show 2");
        assert_eq!(response.headers().get("x-seed").unwrap(), "1");
    }

    #[tokio::test]
    async fn test_unmatched_returns_not_found_and_runs_post_dispatch() {
        let mut router = router();
        let counter = Arc::new(Counter::default());
        router.add_listener(Counting(counter.clone()));

        let response = router.dispatch(get("/nothing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_text(), "Not Found");
        assert_eq!(counter.pre_match.load(Ordering::SeqCst), 1);
        assert_eq!(counter.post_dispatch.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_failure_keeps_previous_response() {
        let router = router();
        router
            .load_routes(&[RouteConfig {
                path: "/boom".to_string(),
                handler: "RouteHandler".to_string(),
                middlewares: vec![],
                controllers: vec!["show".to_string(), "fail".to_string()],
            }])
            .unwrap();

        let response = router.dispatch(get("/boom")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_text(), "Not Found");
    }

    #[tokio::test]
    async fn test_load_routes_rejects_unknown_names_atomically() {
        let router = router();
        router.register_route("/keep", TypeKey::of::<RouteHandler>()).unwrap();

        let mut bad = RouteConfig::new("/bad");
        bad.middlewares.push("missing".to_string());
        let err = router.load_routes(&[RouteConfig::new("/ok"), bad]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownType {
                capability: Capability::Middleware,
                ..
            }
        ));
        assert_eq!(router.list_routes(), vec!["/keep"]);

        let mut wrong = RouteConfig::new("/wrong");
        wrong.middlewares.push("show".to_string());
        let err = router.load_routes(&[wrong]).unwrap_err();
        assert!(matches!(err, ConfigError::Route(RouteError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_unregister_missing_route_is_noop() {
        let router = router();
        router.unregister_route("/never-registered");
        assert!(router.list_routes().is_empty());
    }

    #[tokio::test]
    async fn test_configured_not_found() {
        let router = Router::with_config(
            Arc::new(Container::new()),
            DispatchConfig {
                not_found_status: 410,
                not_found_body: "gone".to_string(),
            },
        );
        let response = router.dispatch(get("/x")).await;
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(response.body_text(), "gone");
    }
}
