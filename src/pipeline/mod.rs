//! Argument compilation and per-request step execution.
//!
//! # Data Flow
//! ```text
//! route arguments (Argument enum, or JSON via Argument::classify)
//!     → compiler.rs (one Step per argument, at bind time)
//!     → routing marker step + compiled steps
//!     → per request: Step::call(&mut RequestContext) → Flow
//! ```
//!
//! # Design Decisions
//! - Every argument becomes the same `Step` shape; the chain runner never
//!   inspects what kind of step it runs
//! - Steps own nothing per request; all state lives in `RequestContext`
//! - Failures short-circuit the chain through `StepError`

pub mod argument;
pub mod compiler;
pub mod context;
pub mod error;
pub mod step;

pub use argument::{Argument, FnInput, MapFn, Output};
pub use compiler::Compiler;
pub use context::{RequestContext, RequestView, ResolveError, ResponseState};
pub use error::{BindError, StepError};
pub use step::{step_fn, Flow, FnStep, SharedStep, Step, StepResult};
