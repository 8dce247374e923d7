//! PostgreSQL adapter.
//!
//! Path params, query strings and form fields arrive as text. Before binding,
//! string values are converted to the parameter types Postgres infers for the
//! statement, so `WHERE id = :params.id:` works against an integer column
//! without a cast in the template.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgTypeInfo, Postgres};
use sqlx::TypeInfo;

use crate::executor::{placeholders, rows, ExecError, Executor};
use crate::template::QueryDescriptor;

/// Executes templates on a Postgres pool with `$N` parameters.
///
/// Returns the rows as an array of objects keyed by column name.
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn parameter_types(&self, sql: &str) -> Result<Vec<PgTypeInfo>, ExecError> {
        let described = sqlx::Executor::describe(&self.pool, sql).await?;
        Ok(described
            .parameters()
            .and_then(|parameters| parameters.left())
            .map(<[PgTypeInfo]>::to_vec)
            .unwrap_or_default())
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn execute(&self, query: QueryDescriptor) -> Result<Value, ExecError> {
        let sql = placeholders::numbered(&query.text, "$");
        let mut values = query.values;
        if values.iter().any(Value::is_string) {
            let types = self.parameter_types(&sql).await?;
            values = coerce_strings(values, &types);
        }
        let fetched = rows::bind_values::<Postgres>(&sql, values)
            .fetch_all(&self.pool)
            .await?;
        Ok(Value::Array(fetched.iter().map(rows::pg_row).collect()))
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// Convert string values to the JSON kind of the matching parameter type.
///
/// Strings that do not parse as the target type are left alone and reach the
/// server unchanged.
pub(crate) fn coerce_strings(values: Vec<Value>, types: &[PgTypeInfo]) -> Vec<Value> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| match (value, types.get(i)) {
            (Value::String(text), Some(ty)) => coerce(text, ty.name()),
            (value, _) => value,
        })
        .collect()
}

fn coerce(text: String, type_name: &str) -> Value {
    let parsed = match type_name {
        "INT2" | "INT4" | "INT8" => text.trim().parse::<i64>().ok().map(Value::from),
        "FLOAT4" | "FLOAT8" | "NUMERIC" => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        "BOOL" => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "on" => Some(Value::Bool(true)),
            "false" | "f" | "0" | "no" | "off" => Some(Value::Bool(false)),
            _ => None,
        },
        "JSON" | "JSONB" => serde_json::from_str(&text).ok(),
        _ => None,
    };
    parsed.unwrap_or(Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strings_follow_parameter_types() {
        let types = [
            PgTypeInfo::with_name("INT4"),
            PgTypeInfo::with_name("FLOAT8"),
            PgTypeInfo::with_name("BOOL"),
            PgTypeInfo::with_name("JSONB"),
            PgTypeInfo::with_name("TEXT"),
        ];
        let values = vec![
            json!("7"),
            json!("2.5"),
            json!("t"),
            json!("{\"a\":1}"),
            json!("42"),
        ];
        assert_eq!(
            coerce_strings(values, &types),
            vec![json!(7), json!(2.5), json!(true), json!({ "a": 1 }), json!("42")]
        );
    }

    #[test]
    fn test_unparseable_and_non_string_values_pass_through() {
        let types = [PgTypeInfo::with_name("INT4"), PgTypeInfo::with_name("INT4")];
        let values = vec![json!("seven"), json!(3), json!("extra")];
        assert_eq!(
            coerce_strings(values, &types),
            vec![json!("seven"), json!(3), json!("extra")]
        );
    }
}
