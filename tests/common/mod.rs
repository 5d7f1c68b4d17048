//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::{Method, StatusCode, Uri};
use futures_util::future::{self, BoxFuture};

use dispatch_core::components::register_builtins;
use dispatch_core::container::{Args, Container, Injectable, ResolveError, TypeKey};
use dispatch_core::dispatch::{DispatchError, DispatchResult, Router};
use dispatch_core::http::{ServerRequest, ServerResponse};
use dispatch_core::pipeline::{Controller, ControllerBase, Middleware, MiddlewareChain};

/// Ordered record of side effects, shared between components and the test.
#[derive(Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

/// Middleware that records entry/exit and always delegates.
pub struct Tracing {
    journal: Arc<Journal>,
}

impl Injectable for Tracing {
    fn dependencies() -> Vec<TypeKey> {
        vec![TypeKey::of::<Journal>()]
    }

    fn construct(args: &mut Args) -> Result<Self, ResolveError> {
        Ok(Self { journal: args.next()? })
    }
}

impl Middleware for Tracing {
    fn process<'a>(&'a self, request: ServerRequest, next: MiddlewareChain) -> BoxFuture<'a, DispatchResult> {
        Box::pin(async move {
            self.journal.push("tracing:in");
            let response = next.handle(request).await;
            self.journal.push("tracing:out");
            response
        })
    }
}

/// Middleware that refuses every request and counts how often it ran.
#[derive(Default)]
pub struct Deny {
    pub calls: AtomicUsize,
}

impl Middleware for Deny {
    fn process<'a>(&'a self, _request: ServerRequest, _next: MiddlewareChain) -> BoxFuture<'a, DispatchResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(future::ready(Ok(ServerResponse::text(StatusCode::FORBIDDEN, "denied"))))
    }
}

/// Controller that appends a greeting for the `name` path variable.
#[derive(Default)]
pub struct Hello;

impl Controller for Hello {
    fn process<'a>(&'a self, mut base: ControllerBase) -> BoxFuture<'a, DispatchResult> {
        let name = base.request.path_variable("name").unwrap_or("stranger").to_string();
        base.response.set_status(StatusCode::OK);
        base.response.write(format!("hello {name}"));
        base.next()
    }
}

/// Controller that appends a suffix.
#[derive(Default)]
pub struct Exclaim;

impl Controller for Exclaim {
    fn process<'a>(&'a self, mut base: ControllerBase) -> BoxFuture<'a, DispatchResult> {
        base.response.write("!");
        base.next()
    }
}

/// Controller that fails after the response was already touched.
#[derive(Default)]
pub struct Broken;

impl Controller for Broken {
    fn process<'a>(&'a self, _base: ControllerBase) -> BoxFuture<'a, DispatchResult> {
        Box::pin(future::ready(Err(DispatchError::handler("backend unavailable"))))
    }
}

/// Controller that panics.
#[derive(Default)]
pub struct Panics;

impl Controller for Panics {
    fn process<'a>(&'a self, _base: ControllerBase) -> BoxFuture<'a, DispatchResult> {
        panic!("controller bug")
    }
}

/// Container with the built-ins plus every fixture above, named for config use.
pub fn container(journal: Arc<Journal>) -> Container {
    let mut container = Container::new();
    register_builtins(&mut container);
    container.register::<Tracing>().as_middleware().named("tracing");
    container.register_default::<Deny>().as_middleware().named("deny");
    container.register_default::<Hello>().as_controller().named("hello");
    container.register_default::<Exclaim>().as_controller().named("exclaim");
    container.register_default::<Broken>().as_controller().named("broken");
    container.register_default::<Panics>().as_controller().named("panics");
    container.set(journal);
    container
}

pub fn router(journal: Arc<Journal>) -> Router {
    Router::new(Arc::new(container(journal)))
}

pub fn get(path: &str) -> ServerRequest {
    ServerRequest::new(Method::GET, path.parse::<Uri>().unwrap())
}
