//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route declaration (at startup):
//!     Krauter::get(path, args) / bind_routes(RouteConfig[])
//!     → matcher.rs (validate path, method)
//!     → pipeline::Compiler (arguments → steps)
//!     → router.rs (group by path, register with axum)
//!
//! Incoming Request:
//!     axum path match
//!     → dispatch.rs (router steps, param hooks, route chains in order)
//!     → http::response (finalizer)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at bind time, immutable at runtime
//! - Bindings that share a path and method run in declaration order, each
//!   passing on to the next when its chain completes
//! - The builder and the produced axum router are separate values

pub mod dispatch;
pub mod matcher;
pub mod router;

use async_trait::async_trait;

use crate::pipeline::{RequestContext, StepResult};

pub use matcher::{validate_path, MethodMatcher};
pub use router::{Kraut, Krauter};

/// Runs once per request for a named path parameter, before route steps.
#[async_trait]
pub trait ParamHook: Send + Sync {
    async fn call(&self, cx: &mut RequestContext, value: &str) -> StepResult;
}

#[async_trait]
impl<F> ParamHook for F
where
    F: Fn(&mut RequestContext, &str) -> StepResult + Send + Sync,
{
    async fn call(&self, cx: &mut RequestContext, value: &str) -> StepResult {
        self(cx, value)
    }
}
