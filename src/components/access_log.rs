//! Request/response logging middleware.

use std::time::Instant;

use futures_util::future::BoxFuture;

use crate::dispatch::DispatchResult;
use crate::http::ServerRequest;
use crate::pipeline::{Middleware, MiddlewareChain};

/// Logs every request that passes through it, with status and latency.
#[derive(Debug, Default)]
pub struct AccessLog;

impl Middleware for AccessLog {
    fn process<'a>(&'a self, request: ServerRequest, next: MiddlewareChain) -> BoxFuture<'a, DispatchResult> {
        Box::pin(async move {
            let started = Instant::now();
            let method = request.method().clone();
            let path = request.path().to_string();

            let result = next.handle(request).await;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            match &result {
                Ok(response) => tracing::info!(
                    method = %method,
                    path = %path,
                    status = response.status().as_u16(),
                    elapsed_ms,
                    "Request completed"
                ),
                Err(e) => tracing::warn!(
                    method = %method,
                    path = %path,
                    error = %e,
                    elapsed_ms,
                    "Request failed"
                ),
            }
            result
        })
    }
}
