//! MySQL adapter.

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::mysql::{MySql, MySqlPool};

use crate::executor::{placeholders, rows, ExecError, Executor};
use crate::template::QueryDescriptor;

/// Executes templates on a MySQL pool with `?` parameters.
///
/// The result is `{ "results": [rows], "fields": [column names] }`.
/// `fields` is empty when the statement returned no rows.
#[derive(Debug, Clone)]
pub struct MySqlExecutor {
    pool: MySqlPool,
}

impl MySqlExecutor {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl Executor for MySqlExecutor {
    async fn execute(&self, query: QueryDescriptor) -> Result<Value, ExecError> {
        let sql = placeholders::positional(&query.text);
        let fetched = rows::bind_values::<MySql>(&sql, query.values)
            .fetch_all(&self.pool)
            .await?;

        let fields = fetched.first().map(rows::column_names).unwrap_or_default();
        let results: Vec<Value> = fetched.iter().map(rows::mysql_row).collect();
        Ok(json!({ "results": results, "fields": fields }))
    }

    fn backend(&self) -> &'static str {
        "mysql"
    }
}
