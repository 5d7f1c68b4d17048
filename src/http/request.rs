//! Request value threaded through the middleware and controller chains.
//!
//! # Design Decisions
//! - Requests are replaced, not mutated: `with_*` consumes and returns a new value
//! - The body is fully buffered (`Bytes`), so clones are cheap
//! - Untyped attributes are JSON values; typed data goes in `extensions`

use std::collections::HashMap;

use axum::body::{Body, Bytes};
use axum::http::{header::HeaderName, Extensions, HeaderMap, HeaderValue, Method, Request, Uri};
use serde_json::Value;

use crate::routing::matcher::PathVariables;

/// An HTTP request as seen by dispatch.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    attributes: HashMap<String, Value>,
    extensions: Extensions,
}

impl ServerRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            attributes: HashMap::new(),
            extensions: Extensions::new(),
        }
    }

    /// Buffer an incoming axum request, rejecting bodies over `body_limit` bytes.
    pub async fn from_http(request: Request<Body>, body_limit: usize) -> Result<Self, axum::Error> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, body_limit).await?;
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            attributes: HashMap::new(),
            extensions: parts.extensions,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text, if present and valid ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    /// Copy of this request with `name` set to `value`.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Copy of this request without the attribute `name`.
    pub fn without_attribute(mut self, name: &str) -> Self {
        self.attributes.remove(name);
        self
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn with_extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// Variables captured by the matched route, if dispatch matched one.
    pub fn path_variables(&self) -> Option<&PathVariables> {
        self.extensions.get::<PathVariables>()
    }

    /// Value of a captured path variable; `None` when absent or unset.
    pub fn path_variable(&self, name: &str) -> Option<&str> {
        self.path_variables().and_then(|variables| variables.get(name))
    }

    pub(crate) fn with_path_variables(self, variables: PathVariables) -> Self {
        self.with_extension(variables)
    }
}
