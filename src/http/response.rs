//! Response finalizer.
//!
//! # Responsibilities
//! - Decide, once per request, what the client receives after the chain ends
//! - Serialize the result slot with the status chosen by the steps
//! - Forward unmatched requests to the fallback router
//!
//! # Decision Table
//! ```text
//! error present            → ErrorHandler
//! response already sent    → that response
//! unmatched or ExitRouter  → fallback router (404 when none)
//! matched                  → result slot (String as text, other JSON, none empty)
//! ```

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::Value;
use tower::ServiceExt;

use crate::http::errors::ErrorHandler;
use crate::observability::metrics;
use crate::pipeline::{Flow, RequestContext, StepError};

/// The original request, kept for forwarding.
pub(crate) struct Forward {
    pub parts: Parts,
    pub body: Bytes,
}

impl Forward {
    async fn send(self, fallback: Option<&Router>) -> Response {
        let Some(router) = fallback else {
            return StatusCode::NOT_FOUND.into_response();
        };
        let request = Request::from_parts(self.parts, Body::from(self.body));
        match router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

/// Build the response for a finished chain.
pub(crate) async fn finalize(
    mut cx: RequestContext,
    outcome: Result<Flow, StepError>,
    forward: Forward,
    fallback: Option<&Router>,
    errors: &dyn ErrorHandler,
) -> Response {
    let flow = match outcome {
        Ok(flow) => flow,
        Err(error) => {
            metrics::record_request("error");
            return errors.handle(error, &mut cx);
        }
    };

    if let Some(sent) = cx.response.take_sent() {
        metrics::record_request("sent");
        return sent;
    }

    if flow == Flow::ExitRouter || !cx.is_matched() {
        tracing::debug!(
            request_id = %cx.request_id(),
            path = %cx.request.path,
            exit = flow == Flow::ExitRouter,
            "Forwarding request"
        );
        metrics::record_request("forwarded");
        return forward.send(fallback).await;
    }

    metrics::record_request("result");
    render_result(&mut cx)
}

/// Send the result slot with the accumulated status and headers.
pub fn render_result(cx: &mut RequestContext) -> Response {
    match cx.take_result() {
        None => cx.response.render(()),
        Some(Value::String(text)) => cx.response.render(text),
        Some(value) => cx.response.render(Json(value)),
    }
}
