//! Request context middleware.
//!
//! Copies the correlation ID and the path variables into request
//! attributes so controllers and handlers see them uniformly.

use futures_util::future::BoxFuture;

use crate::dispatch::DispatchResult;
use crate::http::{ServerRequest, X_REQUEST_ID};
use crate::pipeline::{Middleware, MiddlewareChain};

pub const REQUEST_ID_ATTRIBUTE: &str = "request_id";
pub const PATH_VARIABLES_ATTRIBUTE: &str = "path_variables";

#[derive(Debug, Default)]
pub struct RequestContext;

impl Middleware for RequestContext {
    fn process<'a>(&'a self, request: ServerRequest, next: MiddlewareChain) -> BoxFuture<'a, DispatchResult> {
        let mut request = request;
        if let Some(id) = request.header(X_REQUEST_ID).map(str::to_string) {
            request = request.with_attribute(REQUEST_ID_ATTRIBUTE, id);
        }
        if let Some(variables) = request.path_variables().and_then(|vars| serde_json::to_value(vars).ok()) {
            request = request.with_attribute(PATH_VARIABLES_ATTRIBUTE, variables);
        }
        next.handle(request)
    }
}
