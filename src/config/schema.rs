//! Configuration schema definitions.
//!
//! This module defines the configuration structure for a krauter service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct KrauterConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Connection pool settings.
    pub database: DatabaseConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Routes declared in the file, bound with `Krauter::bind_routes`.
    pub routes: Vec<RouteConfig>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time for request/response in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size.
    pub body_limit_bytes: usize,

    /// Generate and propagate `x-request-id`.
    pub request_id: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            body_limit_bytes: 2 * 1024 * 1024,
            request_id: true,
        }
    }
}

/// Database pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL (`postgres://`, `mysql://`, `sqlite:`).
    pub url: String,

    /// Maximum pooled connections.
    pub max_connections: u32,

    /// How long to wait for a pooled connection, in seconds.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Wrap the server in a request tracing layer.
    pub trace_requests: bool,

    /// Record query and request metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            trace_requests: true,
            metrics_enabled: true,
        }
    }
}

/// A route declared in configuration.
///
/// Each step is classified by shape: a string is a query, an integer a
/// status, a table of strings a query map.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// HTTP method, or `ALL` for any method.
    pub method: String,

    /// Axum path, e.g. `/users/{id}`.
    pub path: String,

    #[serde(default)]
    pub steps: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: KrauterConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_routes_deserialize_from_toml() {
        let config: KrauterConfig = toml::from_str(
            r#"
            [database]
            url = "postgres://localhost/app"

            [[routes]]
            method = "GET"
            path = "/users/{id}"
            steps = ["SELECT * FROM users WHERE id = :params.id:", 200]

            [[routes]]
            method = "GET"
            path = "/dashboard"
            steps = [{ users = "SELECT count(*) FROM users", posts = "SELECT count(*) FROM posts" }]
            "#,
        )
        .unwrap();

        assert_eq!(config.database.url, "postgres://localhost/app");
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].steps[1], json!(200));
        assert_eq!(
            config.routes[1].steps[0]["users"],
            json!("SELECT count(*) FROM users")
        );
    }
}
