//! Diagnostic controller that describes the request it received.

use axum::http::{header, HeaderValue, StatusCode};
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::dispatch::{DispatchError, DispatchResult};
use crate::pipeline::{Controller, ControllerBase};
use crate::routing::PathVariables;

/// Replaces the response body with a JSON description of the request.
#[derive(Debug, Default)]
pub struct Echo;

#[derive(Serialize)]
struct EchoBody<'a> {
    method: &'a str,
    path: &'a str,
    route: &'a str,
    variables: Option<&'a PathVariables>,
    attributes: &'a std::collections::HashMap<String, Value>,
    body: std::borrow::Cow<'a, str>,
}

impl Controller for Echo {
    fn process<'a>(&'a self, mut base: ControllerBase) -> BoxFuture<'a, DispatchResult> {
        let described = serde_json::to_vec(&EchoBody {
            method: base.request.method().as_str(),
            path: base.request.path(),
            route: base.route.path(),
            variables: base.request.path_variables(),
            attributes: base.request.attributes(),
            body: String::from_utf8_lossy(base.request.body()),
        });

        match described {
            Ok(body) => {
                base.response.set_status(StatusCode::OK);
                base.response
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                base.response.set_body(body);
                base.next()
            }
            Err(e) => Box::pin(futures_util::future::ready(Err(DispatchError::handler(e)))),
        }
    }
}
