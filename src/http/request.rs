//! Request context construction.
//!
//! # Responsibilities
//! - Pick up the request ID (header set by the server layer, or a fresh UUID)
//! - Convert path params and the query string to JSON
//! - Parse the buffered body by content type
//!
//! # Design Decisions
//! - The body is buffered once; the bytes are kept so the request can be
//!   forwarded unchanged when no route matches
//! - Repeated query or form keys become arrays, in order

use axum::body::{Body, Bytes};
use axum::extract::RawPathParams;
use axum::http::{header, request::Parts, HeaderMap};
use futures_util::StreamExt;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::pipeline::{RequestContext, RequestView, StepError};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The inbound request ID, or a new UUID v4.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Buffer `body`, failing with `PayloadTooLarge` once it passes `limit` bytes.
pub(crate) async fn read_body(body: Body, limit: usize) -> Result<Bytes, StepError> {
    let mut stream = body.into_data_stream();
    let mut buffered: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|error| StepError::Body(error.to_string()))?;
        if buffered.len() + chunk.len() > limit {
            return Err(StepError::PayloadTooLarge { limit });
        }
        buffered.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buffered))
}

/// Build the per-request context. The body is left `Null`.
pub(crate) fn context(parts: &Parts, params: Option<&RawPathParams>) -> RequestContext {
    let mut view = RequestView::new(parts.method.clone(), parts.uri.path());
    view.headers = parts.headers.clone();
    view.query = pairs_to_json(parts.uri.query().unwrap_or_default().as_bytes());
    if let Some(params) = params {
        view.params = Value::Object(
            params
                .iter()
                .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
                .collect(),
        );
    }
    RequestContext::new(view).with_request_id(request_id(&parts.headers))
}

/// Parse `bytes` according to the `content-type` header.
///
/// JSON and url-encoded forms are decoded, other UTF-8 bodies become a
/// string, empty or binary bodies are `Null`.
pub fn parse_body(headers: &HeaderMap, bytes: &Bytes) -> Result<Value, StepError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mime = content_type.split(';').next().unwrap_or_default().trim();

    if mime == "application/json" || mime.ends_with("+json") {
        serde_json::from_slice(bytes).map_err(|e| StepError::Body(e.to_string()))
    } else if mime == "application/x-www-form-urlencoded" {
        Ok(pairs_to_json(bytes))
    } else {
        Ok(std::str::from_utf8(bytes)
            .map(|text| Value::String(text.to_string()))
            .unwrap_or(Value::Null))
    }
}

fn pairs_to_json(input: &[u8]) -> Value {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(input) {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};
    use serde_json::json;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_read_body_enforces_limit() {
        let bytes = read_body(Body::from("12345"), 5).await.unwrap();
        assert_eq!(&bytes[..], b"12345");

        let err = read_body(Body::from("123456"), 5).await.unwrap_err();
        assert!(matches!(err, StepError::PayloadTooLarge { limit: 5 }));
    }

    #[test]
    fn test_query_pairs_and_repeats() {
        let (parts, _) = Request::get("/search?q=rust&tag=a&tag=b&tag=c&empty=")
            .body(())
            .unwrap()
            .into_parts();
        let cx = context(&parts, None);
        assert_eq!(
            cx.request.query,
            json!({ "q": "rust", "tag": ["a", "b", "c"], "empty": "" })
        );
        assert_eq!(cx.request.path, "/search");
        assert_eq!(cx.request.params, json!({}));
    }

    #[test]
    fn test_request_id_from_header_or_generated() {
        let (parts, _) = Request::get("/")
            .header(X_REQUEST_ID, "req-1")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(context(&parts, None).request_id(), "req-1");

        let generated = request_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&generated).is_ok());
    }

    #[test]
    fn test_parse_json_body() {
        let body = Bytes::from_static(br#"{"name":"kim","age":3}"#);
        let value = parse_body(&headers("application/json; charset=utf-8"), &body).unwrap();
        assert_eq!(value, json!({ "name": "kim", "age": 3 }));
    }

    #[test]
    fn test_parse_invalid_json_is_body_error() {
        let body = Bytes::from_static(b"{nope");
        let err = parse_body(&headers("application/json"), &body).unwrap_err();
        assert!(matches!(err, StepError::Body(_)));
    }

    #[test]
    fn test_parse_form_and_text_bodies() {
        let form = Bytes::from_static(b"name=kim+lee&role=admin");
        assert_eq!(
            parse_body(&headers("application/x-www-form-urlencoded"), &form).unwrap(),
            json!({ "name": "kim lee", "role": "admin" })
        );

        let text = Bytes::from_static(b"hello");
        assert_eq!(parse_body(&headers("text/plain"), &text).unwrap(), json!("hello"));
        assert_eq!(parse_body(&HeaderMap::new(), &Bytes::new()).unwrap(), Value::Null);
    }
}
