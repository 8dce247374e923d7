//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use krauter::config::{ObservabilityConfig, ServerConfig};
use krauter::executor::{executor_fn, ExecError, Executor};
use krauter::{HttpServer, QueryDescriptor};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceExt;

/// Executor that answers with the bound values, so `SELECT :id:` with id = 5 yields `[5]`.
pub fn echo() -> impl Executor {
    executor_fn(|query: QueryDescriptor| async move {
        Ok::<_, ExecError>(Value::Array(query.values))
    })
}

/// Executor that records every descriptor and answers via `respond`.
#[derive(Clone)]
pub struct Recording {
    pub calls: Arc<Mutex<Vec<QueryDescriptor>>>,
}

impl Recording {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|query| query.text.clone())
            .collect()
    }

    pub fn executor<F>(&self, respond: F) -> impl Executor
    where
        F: Fn(&QueryDescriptor) -> Result<Value, ExecError> + Send + Sync + 'static,
    {
        let calls = self.calls.clone();
        executor_fn(move |query: QueryDescriptor| {
            let outcome = respond(&query);
            calls.lock().unwrap().push(query);
            async move { outcome }
        })
    }
}

/// Executor that waits `delay_for(text)` before echoing the text back.
pub fn delayed<F>(delay_for: F) -> impl Executor
where
    F: Fn(&str) -> u64 + Send + Sync + 'static,
{
    let delay_for = Arc::new(delay_for);
    executor_fn(move |query: QueryDescriptor| {
        let delay = Duration::from_millis(delay_for(&query.text));
        async move {
            tokio::time::sleep(delay).await;
            Ok::<_, ExecError>(Value::String(query.text))
        }
    })
}

/// A captured value, shared between a test and a map step.
pub type Captured = Arc<Mutex<Option<Option<Value>>>>;

pub fn captured() -> Captured {
    Arc::new(Mutex::new(None))
}

/// Send `request` through `router` in-process.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body)
}

pub async fn get(router: Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub fn json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap()
}

/// Serve `router` through `HttpServer` on an ephemeral port.
///
/// Dropping the returned sender stops the server.
pub async fn start_server(router: Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(router, &ServerConfig::default(), &ObservabilityConfig::default());
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(server.run(listener, shutdown_on(rx)));
    (addr, tx)
}

fn shutdown_on(rx: oneshot::Receiver<()>) -> impl Future<Output = ()> + Send + 'static {
    async move {
        let _ = rx.await;
    }
}
