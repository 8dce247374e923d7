//! Route matching conditions.
//!
//! # Responsibilities
//! - Match the request method against a bound route
//! - Validate route paths before they reach axum
//!
//! # Design Decisions
//! - Path matching itself is axum's; only the method is matched here
//! - A `GET` route also answers `HEAD`
//! - Invalid paths are rejected at bind time instead of panicking in axum

use axum::http::Method;

use crate::pipeline::BindError;

/// Which methods a bound route handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatcher {
    /// Every method (`all`).
    Any,
    Only(Method),
}

impl MethodMatcher {
    /// Returns true if a request with `method` runs this route.
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::Only(expected) => {
                expected == method || (*expected == Method::GET && *method == Method::HEAD)
            }
        }
    }

    /// Parse a configured method name; `ALL` (any case) matches every method.
    pub fn parse(name: &str) -> Result<Self, BindError> {
        let upper = name.trim().to_ascii_uppercase();
        if upper == "ALL" {
            return Ok(MethodMatcher::Any);
        }
        Method::from_bytes(upper.as_bytes())
            .map(MethodMatcher::Only)
            .map_err(|_| BindError::InvalidMethod(name.to_string()))
    }
}

impl std::fmt::Display for MethodMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MethodMatcher::Any => f.write_str("ALL"),
            MethodMatcher::Only(method) => write!(f, "{}", method),
        }
    }
}

/// Check that `path` is a usable axum route path.
pub fn validate_path(path: &str) -> Result<(), BindError> {
    let invalid = |reason| BindError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    if path.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if !path.starts_with('/') {
        return Err(invalid("must start with `/`"));
    }
    if path.split('/').any(|segment| segment.starts_with(':')) {
        return Err(invalid("parameters are written `{name}`, not `:name`"));
    }
    if path.split('/').any(|segment| segment.starts_with('*')) {
        return Err(invalid("wildcards are written `{*name}`"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_matching() {
        let get = MethodMatcher::Only(Method::GET);
        assert!(get.matches(&Method::GET));
        assert!(get.matches(&Method::HEAD));
        assert!(!get.matches(&Method::POST));

        let post = MethodMatcher::Only(Method::POST);
        assert!(!post.matches(&Method::HEAD));

        assert!(MethodMatcher::Any.matches(&Method::DELETE));
    }

    #[test]
    fn test_parse_method_names() {
        assert_eq!(MethodMatcher::parse("get").unwrap(), MethodMatcher::Only(Method::GET));
        assert_eq!(MethodMatcher::parse("All").unwrap(), MethodMatcher::Any);
        assert_eq!(
            MethodMatcher::parse("PURGE").unwrap().to_string(),
            "PURGE"
        );
        assert!(matches!(
            MethodMatcher::parse("NOT A METHOD"),
            Err(BindError::InvalidMethod(_))
        ));
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("/").is_ok());
        assert!(validate_path("/users/{id}").is_ok());
        assert!(validate_path("/files/{*rest}").is_ok());

        for bad in ["", "users", "/users/:id", "/files/*rest"] {
            assert!(
                matches!(validate_path(bad), Err(BindError::InvalidPath { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
