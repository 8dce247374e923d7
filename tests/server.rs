//! The layered HTTP server over a real socket.

use krauter::http::X_REQUEST_ID;
use krauter::{Argument, FnInput, Krauter};
use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn test_serves_routes_with_request_ids() {
    let mut krauter = Krauter::new(common::echo());
    krauter
        .get(
            "/users/{id}",
            [Argument::map(|input: FnInput<'_>| {
                json!({ "id": input.request.param("id"), "trace": input.request.headers.get("x-request-id").is_some() })
            })],
        )
        .unwrap();
    let (addr, stop) = common::start_server(krauter.into_router()).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/users/9", addr))
        .header(X_REQUEST_ID, "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()[X_REQUEST_ID], "abc-123");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "id": "9", "trace": true }));

    // Generated when the client sends none.
    let response = client
        .get(format!("http://{}/users/9", addr))
        .send()
        .await
        .unwrap();
    assert!(response.headers().contains_key(X_REQUEST_ID));

    let response = client
        .get(format!("http://{}/missing", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let _ = stop.send(());
}
