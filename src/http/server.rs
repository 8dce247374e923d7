//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap a router produced by `Krauter::into_router` with server middleware
//!   (timeout, body limit, request ID, tracing)
//! - Bind the server to a listener
//! - Stop gracefully on a shutdown signal

use std::future::Future;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ObservabilityConfig, ServerConfig};

/// HTTP server for a krauter router.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server around `router`.
    pub fn new(router: Router, config: &ServerConfig, observability: &ObservabilityConfig) -> Self {
        let router = Self::build_router(router, config, observability);
        Self {
            router,
            config: config.clone(),
        }
    }

    /// Apply the middleware layers. The last layer added runs first.
    #[allow(deprecated)]
    fn build_router(
        router: Router,
        config: &ServerConfig,
        observability: &ObservabilityConfig,
    ) -> Router {
        let mut router = router
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(RequestBodyLimitLayer::new(config.body_limit_bytes));

        if observability.trace_requests {
            router = router.layer(TraceLayer::new_for_http());
        }
        if config.request_id {
            router = router
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));
        }
        router
    }

    /// The fully layered router, e.g. for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.request_timeout_secs,
            body_limit_bytes = self.config.body_limit_bytes,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Wait for Ctrl+C.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
