//! Per-request dispatch for one registered path.
//!
//! # Responsibilities
//! - Build the request context (params, query, body)
//! - Run router-level steps, then param hooks, then every route bound to
//!   this path whose method matches, in declaration order
//! - Hand the outcome to the finalizer
//!
//! # Flow Handling
//! ```text
//! Next       → next step (or next route when the chain ends)
//! SkipRoute  → next route
//! Halt       → finalize now
//! ExitRouter → finalize now, forwarding the request
//! error      → finalize now, error handler
//! ```

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequestParts, RawPathParams, Request};
use axum::response::Response;
use axum::Router;

use crate::http::errors::SharedErrorHandler;
use crate::http::{request, response};
use crate::pipeline::{Flow, RequestContext, SharedStep, StepResult};
use crate::routing::matcher::MethodMatcher;
use crate::routing::ParamHook;

/// One compiled binding: marker step first, then the argument steps.
pub(crate) struct Route {
    pub method: MethodMatcher,
    pub steps: Vec<SharedStep>,
}

/// State shared by every path of one router.
pub(crate) struct Shared {
    pub middleware: Vec<SharedStep>,
    pub params: Vec<(String, Arc<dyn ParamHook>)>,
    pub fallback: Option<Router>,
    pub errors: SharedErrorHandler,
    pub body_limit: usize,
}

/// The routes bound to one path.
pub(crate) struct PathTable {
    pub path: String,
    pub routes: Vec<Route>,
    pub shared: Arc<Shared>,
}

/// Axum handler body for `table.path`.
pub(crate) async fn dispatch(table: Arc<PathTable>, req: Request) -> Response {
    let (mut parts, body) = req.into_parts();
    let params = RawPathParams::from_request_parts(&mut parts, &()).await.ok();
    let mut cx = request::context(&parts, params.as_ref());

    tracing::debug!(
        request_id = %cx.request_id(),
        method = %parts.method,
        path = %parts.uri.path(),
        route = %table.path,
        "Dispatching request"
    );

    let (bytes, outcome) = match request::read_body(body, table.shared.body_limit).await {
        Ok(bytes) => match request::parse_body(&parts.headers, &bytes) {
            Ok(value) => {
                cx.request.body = value;
                let outcome = run(&table, &mut cx).await;
                (bytes, outcome)
            }
            Err(error) => (bytes, Err(error)),
        },
        Err(error) => (Bytes::new(), Err(error)),
    };

    let shared = &table.shared;
    response::finalize(
        cx,
        outcome,
        response::Forward { parts, body: bytes },
        shared.fallback.as_ref(),
        shared.errors.as_ref(),
    )
    .await
}

/// Run every applicable step for this request.
pub(crate) async fn run(table: &PathTable, cx: &mut RequestContext) -> StepResult {
    let shared = &table.shared;

    for step in &shared.middleware {
        match step.call(cx).await? {
            Flow::Next | Flow::SkipRoute => {}
            flow => return Ok(flow),
        }
    }

    let method = cx.request.method.clone();
    if !table.routes.iter().any(|route| route.method.matches(&method)) {
        return Ok(Flow::Next);
    }

    for (name, hook) in &shared.params {
        let Some(value) = cx.request.param(name).map(str::to_owned) else {
            continue;
        };
        match hook.call(cx, &value).await? {
            Flow::Next | Flow::SkipRoute => {}
            flow => return Ok(flow),
        }
    }

    for route in table.routes.iter().filter(|route| route.method.matches(&method)) {
        match run_route(route, cx).await? {
            Flow::Next => {}
            flow => return Ok(flow),
        }
    }
    Ok(Flow::Next)
}

async fn run_route(route: &Route, cx: &mut RequestContext) -> StepResult {
    for step in &route.steps {
        match step.call(cx).await? {
            Flow::Next => {}
            Flow::SkipRoute => return Ok(Flow::Next),
            flow => return Ok(flow),
        }
    }
    Ok(Flow::Next)
}
