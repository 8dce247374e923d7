//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, timeout, body limit, request ID, tracing)
//!     → routing dispatch
//!         → request.rs (RequestContext from parts, params, query, body)
//!         → route chains
//!         → response.rs (finalizer)
//!             → errors.rs on failure
//!     → Send to client
//! ```

pub mod errors;
pub mod request;
pub mod response;
pub mod server;

pub use errors::{DefaultErrorHandler, ErrorHandler, SharedErrorHandler};
pub use request::X_REQUEST_ID;
pub use server::{shutdown_signal, HttpServer};
