//! The error-handling collaborator.
//!
//! A failed chain never writes an error body itself; it hands the error to
//! an [`ErrorHandler`], which decides what the client sees.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::pipeline::{RequestContext, StepError};

/// Turns a step failure into a response.
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, error: StepError, cx: &mut RequestContext) -> Response;
}

impl<F> ErrorHandler for F
where
    F: Fn(StepError, &mut RequestContext) -> Response + Send + Sync + 'static,
{
    fn handle(&self, error: StepError, cx: &mut RequestContext) -> Response {
        self(error, cx)
    }
}

pub type SharedErrorHandler = Arc<dyn ErrorHandler>;

/// Logs the error and answers with an empty body.
///
/// A response already sent by a step is kept. Otherwise body errors are
/// `400 Bad Request`, oversized bodies `413 Payload Too Large` and everything
/// else is `500 Internal Server Error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, error: StepError, cx: &mut RequestContext) -> Response {
        tracing::error!(
            request_id = %cx.request_id(),
            method = %cx.request.method,
            path = %cx.request.path,
            error = %error,
            "Request failed"
        );

        if let Some(sent) = cx.response.take_sent() {
            return sent;
        }
        match error {
            StepError::Body(_) => StatusCode::BAD_REQUEST.into_response(),
            StepError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE.into_response(),
            _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RequestView;
    use axum::http::Method;

    fn context() -> RequestContext {
        RequestContext::new(RequestView::new(Method::GET, "/"))
    }

    #[test]
    fn test_default_handler_statuses() {
        let handler = DefaultErrorHandler;
        let response = handler.handle(StepError::Body("bad json".into()), &mut context());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response =
            handler.handle(StepError::PayloadTooLarge { limit: 4 }, &mut context());
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let response = handler.handle(StepError::application("boom"), &mut context());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_default_handler_keeps_sent_response() {
        let mut cx = context();
        cx.response.send((StatusCode::ACCEPTED, "done"));
        let response = DefaultErrorHandler.handle(StepError::application("late"), &mut cx);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_closure_handler() {
        let handler = |error: StepError, _: &mut RequestContext| {
            (StatusCode::IM_A_TEAPOT, error.to_string()).into_response()
        };
        let response = handler.handle(StepError::application("tea"), &mut context());
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
