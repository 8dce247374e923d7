//! Compiles route arguments into steps.
//!
//! # Responsibilities
//! - Map each `Argument` variant to a `Step`
//! - Validate bind-time configuration (status codes)
//! - Run queries through the shared executor, alone or concurrently
//!
//! # Design Decisions
//! - Compilation happens once per route; steps are shared across requests
//! - A query map parses every template before dispatching any query
//! - A failed query map keeps driving its other queries to completion and
//!   stores nothing

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::http::StatusCode;
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde_json::{Map, Value};

use crate::executor::{ExecError, Executor, SharedExecutor};
use crate::observability::metrics;
use crate::pipeline::argument::{Argument, FnInput, MapFn, Output};
use crate::pipeline::context::RequestContext;
use crate::pipeline::error::{BindError, StepError};
use crate::pipeline::step::{Flow, SharedStep, Step, StepResult};
use crate::template::{self, QueryDescriptor, TemplateError};

/// Turns arguments into steps bound to one executor.
#[derive(Clone)]
pub struct Compiler {
    executor: SharedExecutor,
}

impl Compiler {
    pub fn new(executor: SharedExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &SharedExecutor {
        &self.executor
    }

    /// Compile one argument.
    pub fn compile(&self, argument: Argument) -> Result<SharedStep, BindError> {
        let step: SharedStep = match argument {
            Argument::Clear => Arc::new(ClearStep),
            Argument::Map(f) => Arc::new(MapStep {
                f,
                compiler: self.clone(),
            }),
            Argument::Query(template) => Arc::new(QueryStep {
                template,
                executor: self.executor.clone(),
            }),
            Argument::QueryMap(mut queries) => {
                // Later declarations of a key replace earlier ones.
                let mut seen = std::collections::HashSet::new();
                queries.reverse();
                queries.retain(|(key, _)| seen.insert(key.clone()));
                queries.reverse();
                Arc::new(QueryMapStep {
                    queries,
                    executor: self.executor.clone(),
                })
            }
            Argument::Status(code) => {
                let status =
                    StatusCode::from_u16(code).map_err(|_| BindError::InvalidStatus(code))?;
                Arc::new(StatusStep { status })
            }
            Argument::Raw(step) => step,
        };
        Ok(step)
    }

    /// Compile arguments in order, stopping at the first invalid one.
    pub fn compile_all(
        &self,
        arguments: impl IntoIterator<Item = Argument>,
    ) -> Result<Vec<SharedStep>, BindError> {
        arguments
            .into_iter()
            .map(|argument| self.compile(argument))
            .collect()
    }
}

struct ClearStep;

#[async_trait]
impl Step for ClearStep {
    async fn call(&self, cx: &mut RequestContext) -> StepResult {
        cx.clear_result();
        Ok(Flow::Next)
    }
}

struct MapStep {
    f: MapFn,
    compiler: Compiler,
}

#[async_trait]
impl Step for MapStep {
    async fn call(&self, cx: &mut RequestContext) -> StepResult {
        let data = cx.take_result();
        let output = (self.f)(FnInput {
            request: &mut cx.request,
            response: &mut cx.response,
            data,
        })
        .map_err(StepError::Application)?;

        match output {
            Output::Direct(value) => {
                cx.set_result(value);
                Ok(Flow::Next)
            }
            Output::Defer(argument) => {
                tracing::debug!(
                    request_id = %cx.request_id(),
                    argument = ?argument,
                    "Running deferred argument"
                );
                let step = self.compiler.compile(argument)?;
                step.call(cx).await
            }
        }
    }
}

struct QueryStep {
    template: String,
    executor: SharedExecutor,
}

#[async_trait]
impl Step for QueryStep {
    async fn call(&self, cx: &mut RequestContext) -> StepResult {
        let query = template::parse(&self.template, cx)?;
        let value = run_query(self.executor.as_ref(), query, cx.request_id()).await?;
        cx.set_result(value);
        Ok(Flow::Next)
    }
}

struct QueryMapStep {
    queries: Vec<(String, String)>,
    executor: SharedExecutor,
}

#[async_trait]
impl Step for QueryMapStep {
    async fn call(&self, cx: &mut RequestContext) -> StepResult {
        let parsed = self
            .queries
            .iter()
            .map(|(key, text)| Ok((key.as_str(), template::parse(text, cx)?)))
            .collect::<Result<Vec<_>, TemplateError>>()?;

        let request_id = cx.request_id().to_string();
        let executor = self.executor.as_ref();
        let mut pending: FuturesUnordered<_> = parsed
            .into_iter()
            .map(|(key, query)| {
                let request_id = request_id.as_str();
                async move { (key, run_query(executor, query, request_id).await) }
            })
            .collect();

        let mut merged = Map::new();
        let mut failure: Option<ExecError> = None;
        while let Some((key, outcome)) = pending.next().await {
            match outcome {
                Ok(value) if failure.is_none() => {
                    merged.insert(key.to_string(), value);
                }
                Ok(_) => {}
                Err(error) if failure.is_none() => failure = Some(error),
                Err(error) => {
                    tracing::debug!(
                        request_id = %request_id,
                        key = %key,
                        error = %error,
                        "Query failed after an earlier failure"
                    );
                }
            }
        }

        if let Some(error) = failure {
            return Err(error.into());
        }
        cx.set_result(Value::Object(merged));
        Ok(Flow::Next)
    }
}

struct StatusStep {
    status: StatusCode,
}

#[async_trait]
impl Step for StatusStep {
    async fn call(&self, cx: &mut RequestContext) -> StepResult {
        cx.response.set_status(self.status);
        Ok(Flow::Next)
    }
}

/// Execute one query, with logging and metrics.
async fn run_query(
    executor: &dyn Executor,
    query: QueryDescriptor,
    request_id: &str,
) -> Result<Value, ExecError> {
    let backend = executor.backend();
    tracing::debug!(
        request_id = %request_id,
        backend,
        query = %query.text,
        params = query.values.len(),
        "Executing query"
    );

    let start = Instant::now();
    let outcome = executor.execute(query).await;
    metrics::record_query(backend, outcome.is_ok(), start);

    if let Err(error) = &outcome {
        tracing::warn!(request_id = %request_id, backend, error = %error, "Query failed");
    }
    outcome
}
