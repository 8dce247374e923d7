//! Per-request state threaded through a route's steps.
//!
//! # Responsibilities
//! - Expose the inbound request (method, path, headers, params, query, body)
//! - Hold the result slot and the matched flag
//! - Accumulate the response (status, headers, explicit body)
//! - Resolve dotted references used by query templates
//!
//! # Design Decisions
//! - Single owner: steps receive `&mut RequestContext`, one at a time
//! - Lookups never default; the first missing segment is an error

use std::borrow::Cow;

use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use thiserror::Error;

/// A template reference that does not resolve against the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("reference `{path}` is undefined at `{segment}`")]
pub struct ResolveError {
    pub path: String,
    pub segment: String,
}

/// Read view of the inbound request, plus values attached by steps.
#[derive(Debug, Clone, Default)]
pub struct RequestView {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    /// Path parameters captured by the matched route.
    pub params: Value,
    /// Query string pairs. Repeated keys become arrays.
    pub query: Value,
    /// Parsed body (JSON or url-encoded form), `Null` when empty.
    pub body: Value,
    /// Values attached by steps, e.g. an authenticated `user`.
    pub locals: Map<String, Value>,
}

impl RequestView {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            params: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
            body: Value::Null,
            locals: Map::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        insert(&mut self.params, name, value.into());
        self
    }

    pub fn with_query(mut self, name: &str, value: impl Into<Value>) -> Self {
        insert(&mut self.query, name, value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_local(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.locals.insert(name.to_string(), value.into());
        self
    }

    /// Path parameter as a string, if present.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }
}

fn insert(target: &mut Value, name: &str, value: Value) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        map.insert(name.to_string(), value);
    }
}

/// Response under construction.
#[derive(Debug)]
pub struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    sent: Option<Response>,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            sent: None,
        }
    }
}

impl ResponseState {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Send a response now. The finalizer will not send the result slot.
    ///
    /// A second call is ignored; the first response wins.
    pub fn send(&mut self, body: impl IntoResponse) {
        if self.sent.is_some() {
            tracing::warn!("Response already sent, ignoring second send");
            return;
        }
        let response = self.render(body);
        self.sent = Some(response);
    }

    pub fn is_sent(&self) -> bool {
        self.sent.is_some()
    }

    pub(crate) fn take_sent(&mut self) -> Option<Response> {
        self.sent.take()
    }

    /// Apply the accumulated status and headers to `body`.
    ///
    /// A status set explicitly by `body` (anything other than 200) is kept.
    pub(crate) fn render(&self, body: impl IntoResponse) -> Response {
        let mut response = body.into_response();
        if response.status() == StatusCode::OK {
            *response.status_mut() = self.status;
        }
        for (name, value) in &self.headers {
            response.headers_mut().insert(name.clone(), value.clone());
        }
        response
    }
}

/// Mutable state for one request.
#[derive(Debug, Default)]
pub struct RequestContext {
    pub request: RequestView,
    pub response: ResponseState,
    result: Option<Value>,
    matched: bool,
    request_id: Option<String>,
}

impl RequestContext {
    pub fn new(request: RequestView) -> Self {
        Self {
            request,
            ..Self::default()
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn request_id(&self) -> &str {
        self.request_id.as_deref().unwrap_or("-")
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn set_result(&mut self, value: Value) {
        self.result = Some(value);
    }

    pub fn take_result(&mut self) -> Option<Value> {
        self.result.take()
    }

    pub fn clear_result(&mut self) {
        self.result = None;
    }

    /// True once a route's marker step has run for this request.
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    pub(crate) fn mark_matched(&mut self) {
        self.matched = true;
    }

    /// Resolve a dotted reference such as `params.id` or `user.address.city`.
    ///
    /// The first segment selects a root: `params`, `query`, `body`, `headers`,
    /// `method`, `path`, `data` (the result slot) or a key of `locals`.
    /// Remaining segments index objects by key and arrays by position.
    pub fn lookup(&self, path: &str) -> Result<Value, ResolveError> {
        let undefined = |segment: &str| ResolveError {
            path: path.to_string(),
            segment: segment.to_string(),
        };

        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let root: Cow<'_, Value> = match first {
            "params" => Cow::Borrowed(&self.request.params),
            "query" => Cow::Borrowed(&self.request.query),
            "body" => Cow::Borrowed(&self.request.body),
            "headers" => Cow::Owned(headers_to_json(&self.request.headers)),
            "method" => Cow::Owned(Value::String(self.request.method.to_string())),
            "path" => Cow::Owned(Value::String(self.request.path.clone())),
            "data" => self
                .result
                .as_ref()
                .map(Cow::Borrowed)
                .ok_or_else(|| undefined(first))?,
            local => self
                .request
                .locals
                .get(local)
                .map(Cow::Borrowed)
                .ok_or_else(|| undefined(local))?,
        };

        let mut current: &Value = &root;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            }
            .ok_or_else(|| undefined(segment))?;
        }
        Ok(current.clone())
    }
}

fn headers_to_json(headers: &HeaderMap) -> Value {
    let map = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), Value::String(v.to_string())))
        })
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> RequestContext {
        let view = RequestView::new(Method::GET, "/users/7")
            .with_param("id", "7")
            .with_query("page", "2")
            .with_body(json!({ "tags": ["a", "b"], "owner": { "name": "kim" } }))
            .with_local("user", json!({ "id": { "sub": 42 } }));
        RequestContext::new(view)
    }

    #[test]
    fn test_lookup_roots() {
        let cx = context();
        assert_eq!(cx.lookup("params.id").unwrap(), json!("7"));
        assert_eq!(cx.lookup("query.page").unwrap(), json!("2"));
        assert_eq!(cx.lookup("method").unwrap(), json!("GET"));
        assert_eq!(cx.lookup("path").unwrap(), json!("/users/7"));
    }

    #[test]
    fn test_lookup_nested_locals_and_arrays() {
        let cx = context();
        assert_eq!(cx.lookup("user.id.sub").unwrap(), json!(42));
        assert_eq!(cx.lookup("body.tags.1").unwrap(), json!("b"));
        assert_eq!(cx.lookup("body.owner.name").unwrap(), json!("kim"));
    }

    #[test]
    fn test_lookup_missing_segment_fails() {
        let cx = context();
        let err = cx.lookup("user.id.missing").unwrap_err();
        assert_eq!(err.segment, "missing");
        assert_eq!(err.path, "user.id.missing");

        let err = cx.lookup("nobody.id").unwrap_err();
        assert_eq!(err.segment, "nobody");

        // Scalars are not traversable.
        assert!(cx.lookup("params.id.length").is_err());
    }

    #[test]
    fn test_lookup_data_follows_result_slot() {
        let mut cx = context();
        assert!(cx.lookup("data").is_err());
        cx.set_result(json!({ "total": 3 }));
        assert_eq!(cx.lookup("data.total").unwrap(), json!(3));
        cx.clear_result();
        assert!(cx.lookup("data.total").is_err());
    }

    #[test]
    fn test_lookup_headers() {
        let mut cx = context();
        cx.request
            .headers
            .insert("x-tenant", "acme".parse().unwrap());
        assert_eq!(cx.lookup("headers.x-tenant").unwrap(), json!("acme"));
    }

    #[test]
    fn test_send_keeps_first_response() {
        let mut response = ResponseState::default();
        response.set_status(StatusCode::ACCEPTED);
        response.send("first");
        response.send("second");
        assert!(response.is_sent());
        let sent = response.take_sent().unwrap();
        assert_eq!(sent.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_render_keeps_explicit_status() {
        let mut response = ResponseState::default();
        response.set_status(StatusCode::ACCEPTED);
        let rendered = response.render((StatusCode::CREATED, "made"));
        assert_eq!(rendered.status(), StatusCode::CREATED);
    }
}
