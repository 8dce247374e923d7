//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool size > 0)
//! - Check that declared routes are bindable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: KrauterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::KrauterConfig;
use crate::executor::detect_database_type;
use crate::pipeline::Argument;
use crate::routing::{validate_path, MethodMatcher};

/// A single semantic problem, located by its config key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check `config`, collecting every error.
pub fn validate_config(config: &KrauterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("`{}` is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }
    if config.server.body_limit_bytes == 0 {
        errors.push(ValidationError::new("server.body_limit_bytes", "must be > 0"));
    }

    if detect_database_type(&config.database.url).is_none() {
        errors.push(ValidationError::new(
            "database.url",
            format!("unsupported database url `{}`", config.database.url),
        ));
    }
    if config.database.max_connections == 0 {
        errors.push(ValidationError::new("database.max_connections", "must be > 0"));
    }
    if config.database.acquire_timeout_secs == 0 {
        errors.push(ValidationError::new("database.acquire_timeout_secs", "must be > 0"));
    }

    for (i, route) in config.routes.iter().enumerate() {
        if let Err(e) = MethodMatcher::parse(&route.method) {
            errors.push(ValidationError::new(format!("routes[{}].method", i), e.to_string()));
        }
        if let Err(e) = validate_path(&route.path) {
            errors.push(ValidationError::new(format!("routes[{}].path", i), e.to_string()));
        }
        for (j, step) in route.steps.iter().enumerate() {
            if let Err(e) = Argument::classify(step) {
                errors.push(ValidationError::new(
                    format!("routes[{}].steps[{}]", i, j),
                    e.to_string(),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
