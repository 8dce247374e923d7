//! SQLite adapter.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqlitePool};

use crate::executor::{placeholders, rows, ExecError, Executor};
use crate::template::QueryDescriptor;

/// Executes templates on a SQLite pool with `?` parameters.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Executor for SqliteExecutor {
    async fn execute(&self, query: QueryDescriptor) -> Result<Value, ExecError> {
        let sql = placeholders::positional(&query.text);
        let fetched = rows::bind_values::<Sqlite>(&sql, query.values)
            .fetch_all(&self.pool)
            .await?;
        Ok(Value::Array(fetched.iter().map(rows::sqlite_row).collect()))
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
