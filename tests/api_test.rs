mod common;

use allowance_desk::api::{self, AppState};
use allowance_desk::lifecycle::RetirementSystem;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use common::*;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(system: &RetirementSystem) -> Router {
    api::router(AppState::new(
        system.reservations.clone(),
        system.history.clone(),
        system.inventory.clone(),
    ))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_create_confirm_and_status() {
    let system = start(5, ScriptedLedger::new(), RecordingIssuer::new()).await;
    let app = app(&system);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/retirements",
        Some(json!({ "num_allowances": 2, "message": "hello", "wallet": WALLET })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["serial_numbers"], json!([1, 2]));
    let order_id = body["order_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/retirements/status/{order_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert!(body.get("serial_numbers").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/retirements/confirm",
        Some(json!({ "order_id": order_id, "tx_hash": tx(3).as_str() })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "accepted");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/retirements/confirm",
        Some(json!({ "order_id": order_id, "tx_hash": tx(4).as_str() })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("paid_but_not_retired"));

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/retirements/status/{order_id}"),
        None,
    )
    .await;
    assert_eq!(body["status"], "paid_but_not_retired");
    assert_eq!(body["tx_hash"], tx(3).as_str());

    drop(app);
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_error_statuses() {
    let system = start(3, ScriptedLedger::new(), RecordingIssuer::new()).await;
    let app = app(&system);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/retirements",
        Some(json!({ "num_allowances": 100, "wallet": WALLET })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/retirements",
        Some(json!({ "num_allowances": 1, "wallet": "not-a-wallet" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/retirements",
        Some(json!({ "num_allowances": 4, "wallet": WALLET })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient inventory, only 3 available");

    let missing = allowance_desk::model::OrderId::new();
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/retirements/status/{missing}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Order not found");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/retirements/confirm",
        Some(json!({ "order_id": missing.to_string(), "tx_hash": tx(5).as_str() })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Order not found");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/retirements/{missing}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/retirements/confirm",
        Some(json!({ "order_id": "nope", "tx_hash": "0x12" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    drop(app);
    system.shutdown().await.unwrap();
}

async fn send_raw(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let system = start(3, ScriptedLedger::new(), RecordingIssuer::new()).await;
    let app = app(&system);

    let (status, body) = send_raw(&app, Method::POST, "/api/retirements", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send_raw(
        &app,
        Method::POST,
        "/api/retirements/confirm",
        r#"{"order_id": "x"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("tx_hash"));

    let (status, body) = send(&app, Method::GET, "/api/retirements/history?limit=lots", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    drop(app);
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cancel_stock_history_and_health() {
    let system = start(4, ScriptedLedger::new(), RecordingIssuer::new()).await;
    let app = app(&system);

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/retirements",
        Some(json!({ "num_allowances": 3, "wallet": WALLET })),
    )
    .await;
    let order_id = body["order_id"].as_str().unwrap().to_string();

    let (_, stock) = send(&app, Method::GET, "/api/stock", None).await;
    assert_eq!(stock, json!({ "available": 1, "reserved": 3, "retired": 0, "total": 4 }));

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/retirements/{order_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["released"], 3);

    let (_, stock) = send(&app, Method::GET, "/api/stock", None).await;
    assert_eq!(stock["available"], 4);

    let (status, body) = send(&app, Method::GET, "/api/retirements/history?limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["retirements"], json!([]));

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    drop(app);
    system.shutdown().await.unwrap();
}
