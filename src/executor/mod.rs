//! Data access subsystem.
//!
//! # Data Flow
//! ```text
//! QueryDescriptor (?vN? placeholders, values, metadata)
//!     → placeholders.rs (rewrite to $N / ? / @vN)
//!     → adapter (postgres.rs, mysql.rs, sqlite.rs, mssql.rs)
//!     → driver call
//!     → rows.rs (driver rows → JSON)
//! ```
//!
//! # Design Decisions
//! - One trait for every backend; steps never know which driver runs
//! - Driver failures are returned unchanged, never retried
//! - Typed parameters only where the driver needs them (SQL Server)

pub mod mssql;
pub mod mysql;
pub mod placeholders;
pub mod postgres;
pub mod rows;
pub mod sqlite;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::schema::DatabaseConfig;
use crate::template::QueryDescriptor;
use crate::BoxError;

pub use mssql::{MssqlExecutor, SqlType, TdsClient, TypeRegistry};
pub use mysql::MySqlExecutor;
pub use postgres::PgExecutor;
pub use sqlite::SqliteExecutor;

/// Errors surfaced by executors.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The sqlx driver failed.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// A custom driver failed.
    #[error(transparent)]
    Driver(BoxError),

    /// A type annotation names no registered type.
    #[error("unknown parameter type `{0}`")]
    UnknownType(String),

    /// A type constructor rejected its arguments.
    #[error("parameter type `{ty}` rejected arguments {args:?}: {reason}")]
    TypeArguments {
        ty: String,
        args: Vec<u32>,
        reason: String,
    },

    /// The connection URL names no supported backend.
    #[error("unsupported database url `{0}`")]
    UnsupportedUrl(String),
}

/// Runs a parsed query template against a backend.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, query: QueryDescriptor) -> Result<Value, ExecError>;

    /// Label used in logs and metrics.
    fn backend(&self) -> &'static str {
        "custom"
    }
}

pub type SharedExecutor = Arc<dyn Executor>;

/// An executor backed by an async closure.
pub struct FnExecutor<F> {
    f: F,
}

/// Wrap an async closure as an executor.
pub fn executor_fn<F, Fut>(f: F) -> FnExecutor<F>
where
    F: Fn(QueryDescriptor) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ExecError>> + Send,
{
    FnExecutor { f }
}

#[async_trait]
impl<F, Fut> Executor for FnExecutor<F>
where
    F: Fn(QueryDescriptor) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ExecError>> + Send,
{
    async fn execute(&self, query: QueryDescriptor) -> Result<Value, ExecError> {
        (self.f)(query).await
    }
}

/// Backend selected by a connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    PostgreSQL,
    MySQL,
    SQLite,
}

/// Detect the backend from a connection URL.
pub fn detect_database_type(database_url: &str) -> Option<DatabaseType> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Some(DatabaseType::PostgreSQL)
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Some(DatabaseType::MySQL)
    } else if database_url.starts_with("sqlite:") {
        Some(DatabaseType::SQLite)
    } else {
        None
    }
}

/// Open a pool for `config.url` and wrap it in the matching executor.
pub async fn connect(config: &DatabaseConfig) -> Result<SharedExecutor, ExecError> {
    let acquire_timeout = Duration::from_secs(config.acquire_timeout_secs);
    let executor: SharedExecutor = match detect_database_type(&config.url) {
        Some(DatabaseType::PostgreSQL) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(acquire_timeout)
                .connect(&config.url)
                .await?;
            Arc::new(PgExecutor::new(pool))
        }
        Some(DatabaseType::MySQL) => {
            let pool = sqlx::mysql::MySqlPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(acquire_timeout)
                .connect(&config.url)
                .await?;
            Arc::new(MySqlExecutor::new(pool))
        }
        Some(DatabaseType::SQLite) => {
            let pool = sqlx::sqlite::SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(acquire_timeout)
                .connect(&config.url)
                .await?;
            Arc::new(SqliteExecutor::new(pool))
        }
        None => return Err(ExecError::UnsupportedUrl(config.url.clone())),
    };

    tracing::info!(
        backend = executor.backend(),
        max_connections = config.max_connections,
        "Database pool ready"
    );
    Ok(executor)
}
