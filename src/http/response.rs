//! Response value threaded through the middleware and controller chains.

use std::borrow::Cow;

use axum::body::Body;
use axum::http::{header, header::HeaderName, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// An HTTP response under construction.
///
/// Each chain link owns the response it is handed and passes it (or a
/// replacement) on; bodies are appended with `write`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ServerResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Plain-text response.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut response = Self::new(status);
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response.body = body.into().into_bytes();
        response
    }

    /// JSON response.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, serde_json::Error> {
        let mut response = Self::new(status);
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response.body = serde_json::to_vec(value)?;
        Ok(response)
    }

    /// Default response for unmatched requests.
    pub fn not_found(body: impl Into<String>) -> Self {
        Self::text(StatusCode::NOT_FOUND, body)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Append bytes to the body.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) {
        self.body.extend_from_slice(chunk.as_ref());
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

impl Default for ServerResponse {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl IntoResponse for ServerResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_appends() {
        let mut response = ServerResponse::default();
        response.write("one,");
        response.write(b"two");
        assert_eq!(response.body_text(), "one,two");
    }

    #[test]
    fn test_not_found_defaults() {
        let response = ServerResponse::not_found("Not Found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_into_response_keeps_status_and_headers() {
        let response = ServerResponse::json(StatusCode::CREATED, &serde_json::json!({"id": 1}))
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
