//! SQLite adapter tests against an in-memory database.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use krauter::executor::{connect, Executor, SqliteExecutor};
use krauter::config::DatabaseConfig;
use krauter::{args, Krauter, QueryDescriptor};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;

mod common;

// One connection: every `sqlite::memory:` connection is its own database.
async fn executor() -> SqliteExecutor {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let executor = SqliteExecutor::new(pool);
    executor
        .execute(query(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL, note TEXT)",
            vec![],
        ))
        .await
        .unwrap();
    executor
}

fn query(text: &str, values: Vec<Value>) -> QueryDescriptor {
    QueryDescriptor {
        text: text.to_string(),
        metadata: vec![Default::default(); values.len()],
        values,
    }
}

#[tokio::test]
async fn test_rows_are_objects_keyed_by_column() {
    let executor = executor().await;
    executor
        .execute(query(
            "INSERT INTO users (id, name, score, note) VALUES (?v1?, ?v2?, ?v3?, ?v4?)",
            vec![json!(1), json!("kim"), json!(2.5), Value::Null],
        ))
        .await
        .unwrap();

    let rows = executor
        .execute(query("SELECT id, name, score, note FROM users WHERE id = ?v1?", vec![json!(1)]))
        .await
        .unwrap();
    assert_eq!(
        rows,
        json!([{ "id": 1, "name": "kim", "score": 2.5, "note": null }])
    );
    assert_eq!(executor.backend(), "sqlite");
}

#[tokio::test]
async fn test_driver_errors_surface_unchanged() {
    let executor = executor().await;
    let err = executor
        .execute(query("SELECT * FROM missing_table", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, krauter::ExecError::Database(_)));
}

#[tokio::test]
async fn test_connect_builds_sqlite_executor() {
    let config = DatabaseConfig {
        url: "sqlite::memory:".into(),
        max_connections: 1,
        ..DatabaseConfig::default()
    };
    let executor = connect(&config).await.unwrap();
    assert_eq!(executor.backend(), "sqlite");
    let rows = executor
        .execute(query("SELECT ?v1? + 1 AS n", vec![json!(41)]))
        .await
        .unwrap();
    assert_eq!(rows, json!([{ "n": 42 }]));
}

#[tokio::test]
async fn test_routes_over_sqlite() {
    let mut krauter = Krauter::new(executor().await);
    krauter
        .post(
            "/users",
            args!["INSERT INTO users (name) VALUES (:body.name:)", 201u16],
        )
        .unwrap()
        .get(
            "/users/{id}",
            ["SELECT id, name FROM users WHERE id = CAST(:params.id: AS INTEGER)"],
        )
        .unwrap()
        .get(
            "/stats",
            [[
                ("users", "SELECT COUNT(*) AS total FROM users"),
                ("named", "SELECT name FROM users ORDER BY id"),
            ]],
        )
        .unwrap();
    let router = krauter.into_router();

    for name in ["kim", "lee"] {
        let request = Request::post("/users")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("name={}", name)))
            .unwrap();
        let (status, _, body) = common::send(router.clone(), request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(common::json(&body), json!([]));
    }

    let (status, _, body) = common::get(router.clone(), "/users/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(common::json(&body), json!([{ "id": 2, "name": "lee" }]));

    let (_, _, body) = common::get(router, "/stats").await;
    assert_eq!(
        common::json(&body),
        json!({
            "users": [{ "total": 2 }],
            "named": [{ "name": "kim" }, { "name": "lee" }],
        })
    );
}
