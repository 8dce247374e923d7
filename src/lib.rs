//! Declarative query routing on top of Axum.
//!
//! A route is declared as an ordered list of [`Argument`]s instead of a
//! handler body. Each argument is compiled into a [`Step`] at bind time and
//! the steps run in order for every matching request, threading a result
//! value that is finally sent as the response body.
//!
//! ```text
//! Krauter::get(path, [args...])
//!     → pipeline::Compiler (one step per argument)
//!     → routing (marker step + steps, registered with axum)
//!     → request: template::parse → executor::Executor → result slot
//!     → http::response (send result / forward / error handler)
//! ```

// Core subsystems
pub mod executor;
pub mod pipeline;
pub mod routing;
pub mod template;

// HTTP surface
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod observability;

/// Boxed error used for application and driver failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub use config::{load_config, KrauterConfig};
pub use executor::{connect, executor_fn, ExecError, Executor, SharedExecutor};
pub use http::{DefaultErrorHandler, ErrorHandler, HttpServer};
pub use pipeline::{
    step_fn, Argument, BindError, Flow, FnInput, Output, RequestContext, RequestView,
    ResponseState, Step, StepError, StepResult,
};
pub use routing::{Kraut, Krauter, ParamHook};
pub use template::{ParamMeta, QueryDescriptor};

/// Builds a `Vec<Argument>` from heterogeneous values.
///
/// ```ignore
/// krauter.get("/users/{id}", args![
///     "SELECT * FROM users WHERE id = :params.id:",
///     200,
/// ])?;
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$($crate::Argument::from($arg)),*]
    };
}
