//! End-to-end HTTP flows through the router: auth, RBAC, the order
//! lifecycle, payment and the JSON envelope.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use merx_api::middleware::auth::issue_token;
use merx_api::state::{AppState, AuthConfig};
use merx_api::app;
use merx_core::Role;
use merx_order::{FixedGateway, GatewayRegistry};
use merx_store::Db;

const SECRET: &str = "test-secret";

fn auth_config() -> AuthConfig {
    AuthConfig { secret: SECRET.to_string(), expiration: 3600 }
}

async fn test_app() -> Router {
    let db = Db::memory().await.expect("open in-memory db");
    db.migrate().await.expect("run migrations");

    // "alpha" always approves, "beta" always declines.
    let mut registry = GatewayRegistry::new();
    registry.register(Arc::new(FixedGateway::approving("alpha")));
    registry.register(Arc::new(FixedGateway::declining("beta")));

    let state = AppState::assemble(
        &db,
        registry,
        auth_config(),
        Some("alpha".to_string()),
        Duration::from_secs(1),
    );
    app(state)
}

fn customer_token() -> String {
    issue_token(&auth_config(), "cust-1", Role::Customer).expect("mint token")
}

fn admin_token() -> String {
    issue_token(&auth_config(), "admin-1", Role::Admin).expect("mint token")
}

async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = app.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("read body").to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse body")
    };
    (status, value)
}

async fn create_product(app: &Router, admin: &str, stock: i64) -> String {
    let (status, body) = request(
        app,
        Method::POST,
        "/v1/products",
        Some(admin),
        Some(json!({ "name": "Widget", "price_cents": 500, "stock": stock })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().expect("product id").to_string()
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let app = test_app().await;
    let (status, _) = request(&app, Method::GET, "/v1/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        request(&app, Method::GET, "/v1/products", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customers_cannot_use_admin_surfaces() {
    let app = test_app().await;
    let customer = customer_token();

    let (status, body) = request(
        &app,
        Method::POST,
        "/v1/products",
        Some(&customer),
        Some(json!({ "name": "Widget", "price_cents": 500, "stock": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], "error");

    let (status, _) =
        request(&app, Method::GET, "/v1/admin/orders", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn full_order_lifecycle() {
    let app = test_app().await;
    let admin = admin_token();
    let customer = customer_token();

    let product_id = create_product(&app, &admin, 10).await;

    // Place an order for three units.
    let (status, body) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(&customer),
        Some(json!({
            "items": [{ "product_id": product_id, "quantity": 3 }],
            "payment_method": "alpha",
            "shipping_address": "1 Main St",
            "phone": "555-0100"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
    let order_id = body["data"]["id"].as_i64().expect("order id");
    assert_eq!(body["data"]["total_cents"], 1500);
    assert_eq!(body["data"]["fulfillment_status"], "PENDING");
    assert_eq!(body["data"]["payment_status"], "PENDING");

    // Stock was reserved at placement.
    let (_, body) = request(
        &app,
        Method::GET,
        &format!("/v1/products/{product_id}"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(body["data"]["stock"], 7);

    // Pay; gateway falls back to the order's recorded method.
    let (status, body) = request(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/pay"),
        Some(&customer),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order"]["payment_status"], "COMPLETED");
    assert_eq!(body["data"]["order"]["fulfillment_status"], "PROCESSING");
    assert_eq!(body["data"]["payment"]["amount_cents"], 1500);

    // Paying again is a conflict reported as a 400.
    let (status, body) = request(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/pay"),
        Some(&customer),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    // Cancel restores the reserved stock.
    let (status, body) = request(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/cancel"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fulfillment_status"], "CANCELLED");

    let (_, body) = request(
        &app,
        Method::GET,
        &format!("/v1/products/{product_id}"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(body["data"]["stock"], 10);

    // The lifecycle left a notification trail.
    let (status, body) =
        request(&app, Method::GET, "/v1/notifications", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    let feed = body["data"].as_array().expect("feed array");
    assert!(feed.iter().any(|n| n["category"] == "payment_status"));
    assert!(feed.iter().any(|n| n["category"] == "order_status"));
}

#[tokio::test]
async fn insufficient_stock_is_a_client_error() {
    let app = test_app().await;
    let admin = admin_token();
    let customer = customer_token();
    let product_id = create_product(&app, &admin, 2).await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(&customer),
        Some(json!({
            "items": [{ "product_id": product_id, "quantity": 5 }],
            "shipping_address": "1 Main St",
            "phone": "555-0100"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().expect("message").contains("insufficient stock"));

    // Nothing was reserved.
    let (_, body) = request(
        &app,
        Method::GET,
        &format!("/v1/products/{product_id}"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(body["data"]["stock"], 2);
}

#[tokio::test]
async fn declined_payment_maps_to_402() {
    let app = test_app().await;
    let admin = admin_token();
    let customer = customer_token();
    let product_id = create_product(&app, &admin, 5).await;

    let (_, body) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(&customer),
        Some(json!({
            "items": [{ "product_id": product_id, "quantity": 1 }],
            "payment_method": "beta",
            "shipping_address": "1 Main St",
            "phone": "555-0100"
        })),
    )
    .await;
    let order_id = body["data"]["id"].as_i64().expect("order id");

    let (status, body) = request(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/pay"),
        Some(&customer),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["status"], "error");

    // The order is still payable.
    let (_, body) = request(
        &app,
        Method::GET,
        &format!("/v1/orders/{order_id}"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(body["data"]["payment_status"], "PENDING");
}

#[tokio::test]
async fn customers_cannot_see_each_others_orders() {
    let app = test_app().await;
    let admin = admin_token();
    let customer = customer_token();
    let other = issue_token(&auth_config(), "cust-2", Role::Customer).expect("mint token");
    let product_id = create_product(&app, &admin, 5).await;

    let (_, body) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(&customer),
        Some(json!({
            "items": [{ "product_id": product_id, "quantity": 1 }],
            "shipping_address": "1 Main St",
            "phone": "555-0100"
        })),
    )
    .await;
    let order_id = body["data"]["id"].as_i64().expect("order id");

    let (status, _) = request(
        &app,
        Method::GET,
        &format!("/v1/orders/{order_id}"),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admins see every order.
    let (status, body) = request(
        &app,
        Method::GET,
        &format!("/v1/orders/{order_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["customer_id"], "cust-1");
}

#[tokio::test]
async fn admin_status_updates_respect_the_transition_tables() {
    let app = test_app().await;
    let admin = admin_token();
    let customer = customer_token();
    let product_id = create_product(&app, &admin, 5).await;

    let (_, body) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(&customer),
        Some(json!({
            "items": [{ "product_id": product_id, "quantity": 1 }],
            "shipping_address": "1 Main St",
            "phone": "555-0100"
        })),
    )
    .await;
    let order_id = body["data"]["id"].as_i64().expect("order id");

    let (status, body) = request(
        &app,
        Method::PATCH,
        &format!("/v1/orders/{order_id}/status"),
        Some(&admin),
        Some(json!({ "fulfillment_status": "SHIPPED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fulfillment_status"], "SHIPPED");

    // Backwards is refused.
    let (status, _) = request(
        &app,
        Method::PATCH,
        &format!("/v1/orders/{order_id}/status"),
        Some(&admin),
        Some(json!({ "fulfillment_status": "PENDING" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // And a shipped order cannot be cancelled.
    let (status, _) = request(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/cancel"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_stock_adjustment_and_refund_flow() {
    let app = test_app().await;
    let admin = admin_token();
    let customer = customer_token();
    let product_id = create_product(&app, &admin, 3).await;

    // Restock.
    let (status, body) = request(
        &app,
        Method::POST,
        &format!("/v1/products/{product_id}/stock"),
        Some(&admin),
        Some(json!({ "delta": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], 10);

    let (_, body) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(&customer),
        Some(json!({
            "items": [{ "product_id": product_id, "quantity": 2 }],
            "payment_method": "alpha",
            "shipping_address": "1 Main St",
            "phone": "555-0100"
        })),
    )
    .await;
    let order_id = body["data"]["id"].as_i64().expect("order id");

    let (_, body) = request(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/pay"),
        Some(&customer),
        Some(json!({})),
    )
    .await;
    let payment_id = body["data"]["payment"]["id"].as_i64().expect("payment id");

    // Over-refund is refused.
    let (status, _) = request(
        &app,
        Method::POST,
        &format!("/v1/payments/{payment_id}/refund"),
        Some(&admin),
        Some(json!({ "amount_cents": 1_000_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Full refund.
    let (status, body) = request(
        &app,
        Method::POST,
        &format!("/v1/payments/{payment_id}/refund"),
        Some(&admin),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "REFUNDED");

    // Customers cannot reach the payment surface.
    let (status, _) = request(
        &app,
        Method::GET,
        &format!("/v1/payments/{payment_id}"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
