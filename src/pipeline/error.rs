//! Error types for binding and running steps.

use thiserror::Error;

use crate::executor::ExecError;
use crate::template::TemplateError;
use crate::BoxError;

/// Configuration errors, raised when a route is bound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The route path is not usable as an axum path.
    #[error("invalid route path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// A numeric argument is not an HTTP status code.
    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    /// A dynamic value has no argument interpretation.
    #[error("cannot use {kind} as a route argument")]
    Unclassifiable { kind: &'static str },

    /// A configured method name is not a valid HTTP method.
    #[error("invalid HTTP method `{0}`")]
    InvalidMethod(String),
}

/// Failure of a step at request time. Short-circuits the chain.
#[derive(Debug, Error)]
pub enum StepError {
    /// A template reference did not resolve.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The data-access driver failed.
    #[error(transparent)]
    Execute(#[from] ExecError),

    /// A deferred argument could not be compiled.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// A function step or custom step failed.
    #[error("application error: {0}")]
    Application(#[source] BoxError),

    /// The request body could not be read or parsed.
    #[error("invalid request body: {0}")]
    Body(String),

    /// The request body exceeded the router's limit.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
}

impl StepError {
    pub fn application(error: impl Into<BoxError>) -> Self {
        Self::Application(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BindError::InvalidPath {
            path: "users".into(),
            reason: "must start with `/`",
        };
        assert_eq!(
            err.to_string(),
            "invalid route path `users`: must start with `/`"
        );

        let err = StepError::application("boom");
        assert_eq!(err.to_string(), "application error: boom");
    }
}
