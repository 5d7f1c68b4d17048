//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router whose fallback hands every request to dispatch
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener and shut down gracefully
//! - Apply route-table reloads while serving

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dispatch::Router;
use crate::http::request::ServerRequest;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into the fallback handler.
#[derive(Clone)]
struct AppState {
    router: Arc<Router>,
    body_limit: usize,
}

/// Generates a UUID v4 for requests that arrive without an ID.
#[derive(Clone, Copy, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// HTTP front end for a dispatch `Router`.
pub struct HttpServer {
    app: axum::Router,
    router: Arc<Router>,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server dispatching into `router`.
    pub fn new(config: AppConfig, router: Arc<Router>) -> Self {
        let state = AppState {
            router: router.clone(),
            body_limit: config.server.max_body_bytes,
        };
        let app = Self::build_app(&config, state);
        Self { app, router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &AppConfig, state: AppState) -> axum::Router {
        let timeout = Duration::from_secs(config.server.request_timeout_secs);
        axum::Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(X_REQUEST_ID)
                            .and_then(|value| value.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "request",
                            request_id = %request_id,
                            method = %request.method(),
                            path = %request.uri().path(),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(timeout)),
            )
    }

    /// The Axum application, for serving it elsewhere or calling it directly.
    pub fn app(&self) -> axum::Router {
        self.app.clone()
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve `listener` until `shutdown` fires, reloading routes from `route_updates`.
    pub async fn run(
        self,
        listener: TcpListener,
        route_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.router.routes().len(),
            "HTTP server starting"
        );

        let reloader = tokio::spawn(apply_route_updates(
            self.router.clone(),
            route_updates,
            shutdown.resubscribe(),
        ));

        axum::serve(listener, self.app.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Swap the route table for every validated config received, until shutdown.
async fn apply_route_updates(
    router: Arc<Router>,
    mut updates: mpsc::UnboundedReceiver<AppConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                match router.load_routes(&config.routes) {
                    Ok(count) => tracing::info!(routes = count, "Route table reloaded"),
                    Err(e) => tracing::error!(error = %e, "Rejected route reload, keeping current routes"),
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

/// Fallback handler: every request goes through dispatch.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request = match ServerRequest::from_http(request, state.body_limit).await {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, limit = state.body_limit, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };
    state.router.dispatch(request).await.into_response()
}
