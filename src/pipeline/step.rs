//! The uniform step contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::pipeline::context::RequestContext;
use crate::pipeline::error::StepError;

/// What the chain does after a step returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Proceed to the next step.
    Next,
    /// Stop the chain; the finalizer runs immediately.
    Halt,
    /// Skip the remaining steps of the current route.
    SkipRoute,
    /// Leave this router without error and forward the request.
    ExitRouter,
}

pub type StepResult = Result<Flow, StepError>;

/// One unit of per-request processing.
#[async_trait]
pub trait Step: Send + Sync {
    async fn call(&self, cx: &mut RequestContext) -> StepResult;
}

pub type SharedStep = Arc<dyn Step>;

/// A step backed by a synchronous closure.
pub struct FnStep<F>(F);

/// Wrap a closure as a step.
pub fn step_fn<F>(f: F) -> FnStep<F>
where
    F: Fn(&mut RequestContext) -> StepResult + Send + Sync,
{
    FnStep(f)
}

#[async_trait]
impl<F> Step for FnStep<F>
where
    F: Fn(&mut RequestContext) -> StepResult + Send + Sync,
{
    async fn call(&self, cx: &mut RequestContext) -> StepResult {
        (self.0)(cx)
    }
}

/// First step of every bound route.
pub(crate) struct Marker;

#[async_trait]
impl Step for Marker {
    async fn call(&self, cx: &mut RequestContext) -> StepResult {
        cx.mark_matched();
        Ok(Flow::Next)
    }
}
