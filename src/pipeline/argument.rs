//! Route arguments and their classification.
//!
//! # Responsibilities
//! - Represent every supported argument shape as one closed enum
//! - Classify dynamic (JSON) values into arguments at bind time
//! - Provide the function-step input and output types
//!
//! # Design Decisions
//! - Shape is decided once, when the route is declared, never per request
//! - Function steps say "run this argument instead" with `Output::Defer`
//!   rather than returning a marker value

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::Value;

use crate::pipeline::context::{RequestView, ResponseState};
use crate::pipeline::error::BindError;
use crate::pipeline::step::{SharedStep, Step};
use crate::BoxError;

/// Input handed to a function step.
///
/// `data` is the previous result. The result slot stays empty while the
/// function runs.
pub struct FnInput<'a> {
    pub request: &'a mut RequestView,
    pub response: &'a mut ResponseState,
    pub data: Option<Value>,
}

/// What a function step produces.
pub enum Output {
    /// Store this value as the new result.
    Direct(Value),
    /// Compile this argument and run it against the same request.
    Defer(Argument),
}

impl Output {
    pub fn defer(argument: impl Into<Argument>) -> Self {
        Self::Defer(argument.into())
    }
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Self::Direct(value)
    }
}

impl From<Argument> for Output {
    fn from(argument: Argument) -> Self {
        Self::Defer(argument)
    }
}

pub type MapFn = Arc<dyn for<'a> Fn(FnInput<'a>) -> Result<Output, BoxError> + Send + Sync>;

/// One declared route argument.
#[derive(Clone)]
pub enum Argument {
    /// Clear the result slot.
    Clear,
    /// Replace the result with the function's output.
    Map(MapFn),
    /// Run a query template and store its result.
    Query(String),
    /// Run several templates concurrently and store the results by key.
    QueryMap(Vec<(String, String)>),
    /// Set the response status.
    Status(u16),
    /// A pre-built step, used unchanged.
    Raw(SharedStep),
}

impl Argument {
    /// Function step that cannot fail.
    pub fn map<F, O>(f: F) -> Self
    where
        F: Fn(FnInput<'_>) -> O + Send + Sync + 'static,
        O: Into<Output>,
    {
        Self::Map(Arc::new(
            move |input: FnInput<'_>| -> Result<Output, BoxError> { Ok(f(input).into()) },
        ))
    }

    /// Function step whose error fails the chain.
    pub fn try_map<F, O, E>(f: F) -> Self
    where
        F: Fn(FnInput<'_>) -> Result<O, E> + Send + Sync + 'static,
        O: Into<Output>,
        E: Into<BoxError>,
    {
        Self::Map(Arc::new(
            move |input: FnInput<'_>| -> Result<Output, BoxError> {
                f(input).map(Into::into).map_err(Into::into)
            },
        ))
    }

    pub fn query_map<K, V>(queries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::QueryMap(
            queries
                .into_iter()
                .map(|(key, template)| (key.into(), template.into()))
                .collect(),
        )
    }

    pub fn raw(step: impl Step + 'static) -> Self {
        Self::Raw(Arc::new(step))
    }

    /// Classify a dynamic value by its shape.
    ///
    /// `null` clears, a string is a query, an integer is a status and an
    /// object of strings is a query map. Anything else is rejected.
    pub fn classify(value: &Value) -> Result<Self, BindError> {
        match value {
            Value::Null => Ok(Self::Clear),
            Value::String(template) => Ok(Self::Query(template.clone())),
            Value::Number(number) => number
                .as_u64()
                .and_then(|n| u16::try_from(n).ok())
                .map(Self::Status)
                .ok_or(BindError::Unclassifiable { kind: "a non status number" }),
            Value::Object(map) => map
                .iter()
                .map(|(key, template)| match template {
                    Value::String(template) => Ok((key.clone(), template.clone())),
                    _ => Err(BindError::Unclassifiable {
                        kind: "an object with non string values",
                    }),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::QueryMap),
            Value::Bool(_) => Err(BindError::Unclassifiable { kind: "a boolean" }),
            Value::Array(_) => Err(BindError::Unclassifiable { kind: "an array" }),
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear => f.write_str("Clear"),
            Self::Map(_) => f.write_str("Map(..)"),
            Self::Query(template) => f.debug_tuple("Query").field(template).finish(),
            Self::QueryMap(queries) => f.debug_tuple("QueryMap").field(queries).finish(),
            Self::Status(status) => f.debug_tuple("Status").field(status).finish(),
            Self::Raw(_) => f.write_str("Raw(..)"),
        }
    }
}

impl From<()> for Argument {
    fn from(_: ()) -> Self {
        Self::Clear
    }
}

impl From<&str> for Argument {
    fn from(template: &str) -> Self {
        Self::Query(template.to_string())
    }
}

impl From<String> for Argument {
    fn from(template: String) -> Self {
        Self::Query(template)
    }
}

impl From<u16> for Argument {
    fn from(status: u16) -> Self {
        Self::Status(status)
    }
}

impl From<StatusCode> for Argument {
    fn from(status: StatusCode) -> Self {
        Self::Status(status.as_u16())
    }
}

impl From<SharedStep> for Argument {
    fn from(step: SharedStep) -> Self {
        Self::Raw(step)
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Argument
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(queries: [(K, V); N]) -> Self {
        Self::query_map(queries)
    }
}

impl<K, V> From<Vec<(K, V)>> for Argument
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(queries: Vec<(K, V)>) -> Self {
        Self::query_map(queries)
    }
}

impl From<BTreeMap<String, String>> for Argument {
    fn from(queries: BTreeMap<String, String>) -> Self {
        Self::query_map(queries)
    }
}

impl From<HashMap<String, String>> for Argument {
    fn from(queries: HashMap<String, String>) -> Self {
        Self::query_map(queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_shapes() {
        assert!(matches!(Argument::classify(&Value::Null), Ok(Argument::Clear)));
        assert!(matches!(
            Argument::classify(&json!("SELECT 1")),
            Ok(Argument::Query(q)) if q == "SELECT 1"
        ));
        assert!(matches!(Argument::classify(&json!(201)), Ok(Argument::Status(201))));

        match Argument::classify(&json!({ "a": "qa", "b": "qb" })) {
            Ok(Argument::QueryMap(queries)) => {
                assert_eq!(queries.len(), 2);
                assert!(queries.contains(&("a".to_string(), "qa".to_string())));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_rejects_unusable_values() {
        assert!(Argument::classify(&json!(true)).is_err());
        assert!(Argument::classify(&json!([1, 2])).is_err());
        assert!(Argument::classify(&json!(-1)).is_err());
        assert!(Argument::classify(&json!(70000)).is_err());
        assert!(Argument::classify(&json!({ "a": 1 })).is_err());
    }

    #[test]
    fn test_from_conversions() {
        assert!(matches!(Argument::from(()), Argument::Clear));
        assert!(matches!(Argument::from(404u16), Argument::Status(404)));
        assert!(matches!(
            Argument::from(StatusCode::CREATED),
            Argument::Status(201)
        ));
        assert!(matches!(
            Argument::from([("users", "SELECT 1")]),
            Argument::QueryMap(q) if q.len() == 1
        ));
    }
}
