//! HTTP API tests
//!
//! Drives the router directly with `tower::ServiceExt::oneshot` and checks
//! status codes, error bodies and the actor header.

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::RecordingNotifier;
use csm_backend::{create_app, AppState, Config};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    create_app(AppState::with_notifier(
        Config::default(),
        Arc::new(RecordingNotifier::new()),
    ))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_as(app, method, uri, body, Some("nurse.ana")).await
}

async fn send_as(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    actor: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register(app: &Router, name: &str, quantity: i64) -> String {
    let (status, item) = send(
        app,
        Method::POST,
        "/api/v1/items",
        Some(json!({
            "name": name,
            "category": "material",
            "unit": "box",
            "quantity": quantity,
            "min_quantity": 5,
            "unit_price": "12.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    item["id"].as_str().unwrap().to_string()
}

async fn approved_order(app: &Router, item_id: &str, qty: i64) -> String {
    let (status, order) = send(
        app,
        Method::POST,
        "/api/v1/orders",
        Some(json!({
            "supplier_name": "Lab X",
            "lines": [{ "item_id": item_id, "ordered_qty": qty, "unit": "box", "unit_price": "12.00" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        Method::POST,
        &format!("/api/v1/orders/{}/approve", order_id),
        Some(json!({ "confirmed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    order_id
}

#[tokio::test]
async fn test_health_reports_counts() {
    let app = app();
    register(&app, "Gauze", 0).await;

    let (status, body) = send(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["items"], 1);
    assert_eq!(body["open_orders"], 0);
}

#[tokio::test]
async fn test_movement_records_actor_header() {
    let app = app();
    let item_id = register(&app, "Gauze", 10).await;

    let (status, movement) = send_as(
        &app,
        Method::POST,
        &format!("/api/v1/items/{}/movements", item_id),
        Some(json!({ "kind": "exit", "quantity": 4, "reason": "procedure_use" })),
        Some("dr.costa"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(movement["actor"], "dr.costa");

    let (_, item) = send(&app, Method::GET, &format!("/api/v1/items/{}", item_id), None).await;
    assert_eq!(item["quantity"], 6);
}

#[tokio::test]
async fn test_missing_actor_is_anonymous() {
    let app = app();
    let (status, item) = send_as(
        &app,
        Method::POST,
        "/api/v1/items",
        Some(json!({
            "name": "Syringe",
            "category": "medication",
            "unit": "unit",
            "quantity": 3,
            "min_quantity": 0,
            "unit_price": "0.80"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/v1/items/{}/movements", item["id"].as_str().unwrap());
    let (_, movements) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(movements[0]["actor"], "anonymous");
}

#[tokio::test]
async fn test_blank_actor_header_is_rejected() {
    let app = app();
    let (status, body) = send_as(&app, Method::GET, "/api/v1/items", None, Some("  ")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = send_as(
        &app,
        Method::POST,
        "/api/v1/items",
        Some(json!({ "name": "x", "category": "other", "unit": "unit", "quantity": 0, "min_quantity": 0, "unit_price": "1" })),
        Some("  "),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "x-actor-id");
}

#[tokio::test]
async fn test_error_statuses() {
    let app = app();
    let item_id = register(&app, "Gauze", 2).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/items/{}/movements", item_id),
        Some(json!({ "kind": "exit", "quantity": 3, "reason": "loss" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/items/{}/movements", item_id),
        Some(json!({ "kind": "entry", "quantity": 0, "reason": "donation" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_QUANTITY");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/orders/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_receive_flow_over_http() {
    let app = app();
    let item_id = register(&app, "Gauze", 0).await;
    let order_id = approved_order(&app, &item_id, 50).await;
    let receive_uri = format!("/api/v1/orders/{}/receive", order_id);

    let short = json!({
        "invoice_number": "NF-77",
        "line_receipts": [{ "item_id": item_id, "received_qty": 48 }],
        "confirmed": true
    });
    let (status, body) = send(&app, Method::POST, &receive_uri, Some(short)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "notes");

    let unconfirmed = json!({
        "invoice_number": "NF-77",
        "line_receipts": [{ "item_id": item_id, "received_qty": 50 }]
    });
    let (status, _) = send(&app, Method::POST, &receive_uri, Some(unconfirmed)).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    let noted = json!({
        "invoice_number": "NF-77",
        "line_receipts": [{ "item_id": item_id, "received_qty": 48 }],
        "notes": "two boxes missing",
        "confirmed": true
    });
    let (status, summary) = send(&app, Method::POST, &receive_uri, Some(noted.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["has_discrepancy"], true);
    assert_eq!(summary["lines"][0]["classification"], "partial");

    let (status, body) = send(&app, Method::POST, &receive_uri, Some(noted)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_STATE_TRANSITION");

    let (_, item) = send(&app, Method::GET, &format!("/api/v1/items/{}", item_id), None).await;
    assert_eq!(item["quantity"], 48);
}

#[tokio::test]
async fn test_delete_item_on_open_order_conflicts() {
    let app = app();
    let item_id = register(&app, "Gauze", 0).await;
    let order_id = approved_order(&app, &item_id, 5).await;
    let item_uri = format!("/api/v1/items/{}", item_id);

    let (status, body) = send(&app, Method::DELETE, &item_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/orders/{}/cancel", order_id),
        Some(json!({ "reason": "duplicate" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::DELETE, &item_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &item_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_orders_filters_by_state() {
    let app = app();
    let item_id = register(&app, "Gauze", 0).await;
    approved_order(&app, &item_id, 5).await;

    let (_, approved) = send(&app, Method::GET, "/api/v1/orders?state=approved", None).await;
    assert_eq!(approved.as_array().unwrap().len(), 1);

    let (_, pending) = send(&app, Method::GET, "/api/v1/orders?state=pending", None).await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_csv_export_sets_content_type() {
    let app = app();
    register(&app, "Gauze", 4).await;

    let request = Request::builder()
        .uri("/api/v1/stock/movements?format=csv")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("id,item_id,item_name,kind"));
    assert_eq!(text.lines().count(), 2);
}

#[tokio::test]
async fn test_unknown_movement_codes_are_typed_validation_errors() {
    let app = app();
    let item_id = register(&app, "Gauze", 5).await;
    let uri = format!("/api/v1/items/{}/movements", item_id);

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "kind": "exit", "quantity": 1, "reason": "teleport" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "reason");

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "kind": "transfer", "quantity": 1, "reason": "loss" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "kind");

    // A known reason on the wrong kind reports the same shape
    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "kind": "exit", "quantity": 1, "reason": "purchase" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "reason");

    let (_, movements) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(movements.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_cancellation_reason_is_typed_validation_error() {
    let app = app();
    let item_id = register(&app, "Gauze", 0).await;
    let order_id = approved_order(&app, &item_id, 5).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/orders/{}/cancel", order_id),
        Some(json!({ "reason": "vendor_fraud" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "reason");

    let (_, order) = send(&app, Method::GET, &format!("/api/v1/orders/{}", order_id), None).await;
    assert_eq!(order["state"], "approved");
}

#[tokio::test]
async fn test_malformed_bodies_are_typed_validation_errors() {
    let app = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"supplier_name\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "body");

    // Missing required field
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/items",
        Some(json!({ "category": "material", "unit": "box" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "body");
}

#[tokio::test]
async fn test_unknown_state_filter_is_rejected() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/v1/orders?state=shipped", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "state");
}
