//! HTTP-level tests for the ledger API.
//!
//! Each test builds the full router (middleware stack included) over a fresh
//! in-memory store and drives it with `oneshot`.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use ledger_hex::{TransferConfig, inbound::AppState, inbound::HttpServer};
use ledger_repo::MemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    HttpServer::new(AppState::new(store, TransferConfig::default())).router()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn open(app: &Router, id: i64, balance: &str) {
    let (status, _) = send(
        app,
        post(
            "/api/v1/accounts",
            json!({"account_id": id, "initial_balance": balance}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn balance(app: &Router, id: i64) -> String {
    let (status, body) = send(app, get(&format!("/api/v1/accounts/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    body["balance"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = app();

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "ledger-transfers");

    let (status, json) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ready");
    assert_eq!(json["checks"]["database"], "ok");
}

#[tokio::test]
async fn test_create_and_get_account() {
    let app = app();

    let (status, body) = send(
        &app,
        post(
            "/api/v1/accounts",
            json!({"account_id": 7, "initial_balance": "100.25"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"account_id": 7, "balance": "100.25"}));

    assert_eq!(balance(&app, 7).await, "100.25");
}

#[tokio::test]
async fn test_duplicate_account_conflicts() {
    let app = app();
    open(&app, 1, "10").await;

    let (status, body) = send(
        &app,
        post(
            "/api/v1/accounts",
            json!({"account_id": 1, "initial_balance": "5"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "account_exists");
}

#[tokio::test]
async fn test_create_account_validation() {
    let app = app();

    let (status, body) = send(
        &app,
        post(
            "/api/v1/accounts",
            json!({"account_id": 0, "initial_balance": "-3"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_failed");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["field"], "account_id");
    assert_eq!(errors[1]["field"], "initial_balance");
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let app = app();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/transactions")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_json");

    // Unknown fields are rejected too.
    let (status, body) = send(
        &app,
        post(
            "/api/v1/accounts",
            json!({"account_id": 1, "initial_balance": "1", "owner": "x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_json");
}

#[tokio::test]
async fn test_missing_account_echoes_request_id() {
    let app = app();

    let req = Request::builder()
        .uri("/api/v1/accounts/99")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-request-id"], "req-123");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "account_not_found");
    assert_eq!(json["request_id"], "req-123");
}

#[tokio::test]
async fn test_invalid_path_id() {
    let app = app();

    let (status, body) = send(&app, get("/api/v1/accounts/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, _) = send(&app, get("/api/v1/transactions/-4")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transfer_moves_funds() {
    let app = app();
    open(&app, 1, "100").await;
    open(&app, 2, "50").await;

    let (status, body) = send(
        &app,
        post(
            "/api/v1/transactions",
            json!({"source_account_id": 1, "destination_account_id": 2, "amount": "30.5"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["source_account_id"], 1);
    assert_eq!(body["destination_account_id"], 2);
    assert_eq!(body["amount"], "30.5");
    let tx_id = body["transaction_id"].as_i64().unwrap();

    assert_eq!(balance(&app, 1).await, "69.5");
    assert_eq!(balance(&app, 2).await, "80.5");

    let (status, fetched) = send(&app, get(&format!("/api/v1/transactions/{tx_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, body);
}

#[tokio::test]
async fn test_transfer_insufficient_balance() {
    let app = app();
    open(&app, 1, "10").await;
    open(&app, 2, "0").await;

    let (status, body) = send(
        &app,
        post(
            "/api/v1/transactions",
            json!({"source_account_id": 1, "destination_account_id": 2, "amount": "10.01"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "insufficient_balance");

    assert_eq!(balance(&app, 1).await, "10");
    assert_eq!(balance(&app, 2).await, "0");
}

#[tokio::test]
async fn test_transfer_validation_and_missing_accounts() {
    let app = app();
    open(&app, 1, "10").await;

    let (status, body) = send(
        &app,
        post(
            "/api/v1/transactions",
            json!({"source_account_id": 1, "destination_account_id": 1, "amount": "0"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        post(
            "/api/v1/transactions",
            json!({"source_account_id": 1, "destination_account_id": 2, "amount": "1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "account_not_found");
}

#[tokio::test]
async fn test_unknown_transaction() {
    let app = app();

    let (status, body) = send(&app, get("/api/v1/transactions/12345")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "transaction_not_found");
}

#[tokio::test]
async fn test_account_history_newest_first() {
    let app = app();
    open(&app, 1, "100").await;
    open(&app, 2, "0").await;
    open(&app, 3, "0").await;

    for (dst, amount) in [(2, "1"), (3, "2"), (2, "3")] {
        let (status, _) = send(
            &app,
            post(
                "/api/v1/transactions",
                json!({"source_account_id": 1, "destination_account_id": dst, "amount": amount}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, get("/api/v1/accounts/1/transactions")).await;
    assert_eq!(status, StatusCode::OK);
    let amounts: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["amount"].as_str().unwrap())
        .collect();
    assert_eq!(amounts, vec!["3", "2", "1"]);

    let (_, body) = send(&app, get("/api/v1/accounts/2/transactions?limit=1&offset=1")).await;
    let page = body.as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["amount"], "1");

    let (status, _) = send(&app, get("/api/v1/accounts/9/transactions")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_paging_query_uses_error_body() {
    let app = app();
    open(&app, 1, "10").await;

    let req = Request::builder()
        .uri("/api/v1/accounts/1/transactions?limit=abc")
        .header("x-request-id", "req-q")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "invalid_query");
    assert_eq!(body["request_id"], "req-q");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = app();

    let (status, body) = send(&app, get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/transactions"].is_object());
}
