mod common;

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use shop_admin::api::create_api_router;

use common::{category, customer, product, setup_db, Customer};

async fn spawn_app(db: sea_orm::DatabaseConnection) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let address = listener.local_addr().expect("Listener has an address");
    let app = create_api_router(Arc::new(db));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server crashed");
    });
    format!("http://{address}/api")
}

fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("Money is serialized as a string")
        .parse()
        .expect("Money parses as a decimal")
}

async fn json_body(response: reqwest::Response) -> Value {
    response.json().await.expect("Failed to parse JSON body")
}

#[tokio::test]
async fn cart_to_placed_order_over_http() {
    let db = setup_db().await;
    let Customer { user, .. } = customer(&db, "Ada", "Lovelace", "Texas").await;
    let bakery = category(&db).await;
    let bagel = product(&db, bakery.id, "Bagel", 10).await;
    let base = spawn_app(db.clone()).await;
    let client = Client::new();

    let response = client
        .post(format!("{base}/users/{}/cart", user.id))
        .json(&json!({ "product_id": bagel.id, "quantity": 2 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let cart = json_body(response).await;
    assert_eq!(cart["status"], "UNPLACED");
    assert_eq!(decimal(&cart["value"]), Decimal::from(20));
    assert_eq!(cart["line_items"][0]["product_name"], "Bagel");
    let order_id = cart["id"].as_i64().expect("Order has an id");

    let response = client
        .post(format!("{base}/users/{}/cart/merge", user.id))
        .json(&json!({ "items": [
            { "product_id": bagel.id.to_string(), "quantity": "3" },
            { "product_id": "", "quantity": "1" },
        ] }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let merged = json_body(response).await;
    assert_eq!(merged["line_items"][0]["quantity"], 5);

    let response = client
        .post(format!("{base}/orders/{order_id}/place"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let placed = json_body(response).await;
    assert_eq!(placed["status"], "PLACED");
    assert!(placed["checkout_date"].is_string());

    let response = client
        .get(format!("{base}/orders?user_id={}", user.id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let summaries = json_body(response).await;
    assert_eq!(summaries.as_array().map(Vec::len), Some(1));
    assert_eq!(decimal(&summaries[0]["value"]), Decimal::from(50));
}

#[tokio::test]
async fn reopen_conflict_is_unprocessable() {
    let db = setup_db().await;
    let Customer { user, .. } = customer(&db, "Ada", "Lovelace", "Texas").await;
    let bakery = category(&db).await;
    let bagel = product(&db, bakery.id, "Bagel", 10).await;
    let base = spawn_app(db.clone()).await;
    let client = Client::new();

    let placed = common::placed_order(&db, user.id, &[(bagel.id, 1)], chrono::Utc::now()).await;

    let response = client
        .get(format!("{base}/users/{}/cart", user.id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .post(format!("{base}/orders/{}/reopen", placed.id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "user already has an unplaced order");
    assert_eq!(body["field"], "checkout_date");
}

#[tokio::test]
async fn foreign_address_is_rejected() {
    let db = setup_db().await;
    let ada = customer(&db, "Ada", "Lovelace", "Texas").await;
    let bob = customer(&db, "Bob", "Babbage", "Ohio").await;
    let base = spawn_app(db.clone()).await;
    let client = Client::new();

    let cart = json_body(
        client
            .get(format!("{base}/users/{}/cart", ada.user.id))
            .send()
            .await
            .expect("Failed to send request"),
    )
    .await;

    let response = client
        .patch(format!("{base}/orders/{}", cart["id"]))
        .json(&json!({ "billing_id": bob.address.id, "shipping_id": ada.address.id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["field"], "billing_id");
}

#[tokio::test]
async fn missing_records_are_not_found() {
    let db = setup_db().await;
    let base = spawn_app(db).await;
    let client = Client::new();

    let response = client
        .get(format!("{base}/orders/9999"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["error"],
        "No order with 9999 id was found"
    );

    let response = client
        .get(format!("{base}/users/9999/cart"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_series_are_labelled() {
    let db = setup_db().await;
    let base = spawn_app(db).await;
    let client = Client::new();

    let response = client
        .get(format!("{base}/admin/analytics/orders_by_day?n=3"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let series = json_body(response).await;
    let labels: Vec<&str> = series
        .as_array()
        .expect("Series is an array")
        .iter()
        .filter_map(|entry| entry["label"].as_str())
        .collect();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels[0], "Today");
    assert_eq!(labels[1], "Yesterday");

    let response = client
        .get(format!("{base}/admin/dashboard"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let dashboard = json_body(response).await;
    assert_eq!(dashboard["totals"]["orders"], 0);
    assert_eq!(decimal(&dashboard["last_7_days"]["revenue"]), Decimal::ZERO);
    assert!(dashboard["superlatives"]["most_orders_placed"].is_null());
}

#[tokio::test]
async fn oversized_analytics_params_are_unprocessable() {
    let db = setup_db().await;
    let base = spawn_app(db).await;
    let client = Client::new();

    let response = client
        .get(format!("{base}/admin/analytics/totals?days=4294967295"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["field"], "days");

    let response = client
        .get(format!("{base}/admin/analytics/orders_by_week?n=20000000"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["field"], "n");

    let response = client
        .get(format!("{base}/admin/analytics/totals?days=30"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
}
