mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use storefront_api::{
    entities::{order, Order},
    payments::webhook::sign_payload,
    services::AddToCartInput,
};

use common::{signed_checkout_event, TestApp, TEST_WEBHOOK_SECRET};

const WEBHOOK_URI: &str = "/api/v1/payments/webhook";

async fn seed_cart(app: &TestApp, cart_code: &str) {
    let product = app.seed_product(&format!("{cart_code}-item"), dec!(12.50)).await;
    app.state
        .services
        .cart
        .add_item(AddToCartInput {
            cart_code: cart_code.to_string(),
            product_id: product.id,
            quantity: Some(2),
        })
        .await
        .expect("seed cart");
}

async fn order_count(app: &TestApp, session_id: &str) -> usize {
    Order::find()
        .filter(order::Column::StripeCheckoutId.eq(session_id))
        .all(&*app.state.db)
        .await
        .expect("query orders")
        .len()
}

#[tokio::test]
async fn signed_delivery_is_accepted_and_fulfilled() {
    let app = TestApp::new().await;
    seed_cart(&app, "wh-accept").await;

    let (body, header) = signed_checkout_event("cs_wh_accept", Some("wh-accept"), 2500);
    let response = app
        .request_raw(
            Method::POST,
            WEBHOOK_URI,
            body,
            &[("stripe-signature", header.as_str())],
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(order_count(&app, "cs_wh_accept").await, 1);
}

#[tokio::test]
async fn redelivered_webhook_is_acknowledged_without_a_second_order() {
    let app = TestApp::new().await;
    seed_cart(&app, "wh-redeliver").await;

    let (body, header) = signed_checkout_event("cs_wh_redeliver", Some("wh-redeliver"), 2500);
    for _ in 0..2 {
        let response = app
            .request_raw(
                Method::POST,
                WEBHOOK_URI,
                body.clone(),
                &[("stripe-signature", header.as_str())],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(order_count(&app, "cs_wh_redeliver").await, 1);
}

#[tokio::test]
async fn tampered_payload_is_rejected_with_a_generic_400() {
    let app = TestApp::new().await;
    seed_cart(&app, "wh-tamper").await;

    let (mut body, header) = signed_checkout_event("cs_wh_tamper", Some("wh-tamper"), 2500);
    // Flip one byte after signing.
    let last = body.len() - 2;
    body[last] ^= 0x01;

    let response = app
        .request_raw(
            Method::POST,
            WEBHOOK_URI,
            body,
            &[("stripe-signature", header.as_str())],
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(order_count(&app, "cs_wh_tamper").await, 0);
}

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let app = TestApp::new().await;

    let (body, _) = signed_checkout_event("cs_wh_noheader", Some("anything"), 2500);
    let response = app.request_raw(Method::POST, WEBHOOK_URI, body, &[]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stale_timestamp_is_rejected() {
    let app = TestApp::new().await;
    seed_cart(&app, "wh-stale").await;

    let payload = json!({
        "id": "evt_stale",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_wh_stale",
                "amount_total": 2500,
                "currency": "usd",
                "metadata": { "cart_code": "wh-stale" }
            }
        }
    });
    let body = serde_json::to_vec(&payload).expect("serialize payload");

    // Signed an hour ago, well outside the tolerance window.
    let timestamp = (Utc::now().timestamp() - 3600).to_string();
    let signature = sign_payload(TEST_WEBHOOK_SECRET, &timestamp, &body);
    let header = format!("t={},v1={}", timestamp, signature);

    let response = app
        .request_raw(
            Method::POST,
            WEBHOOK_URI,
            body,
            &[("stripe-signature", header.as_str())],
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(order_count(&app, "cs_wh_stale").await, 0);
}

#[tokio::test]
async fn unhandled_event_types_are_acknowledged_and_ignored() {
    let app = TestApp::new().await;

    let payload = json!({
        "id": "evt_other",
        "type": "invoice.paid",
        "data": {
            "object": {
                "id": "in_123",
                "metadata": {}
            }
        }
    });
    let body = serde_json::to_vec(&payload).expect("serialize payload");
    let timestamp = Utc::now().timestamp().to_string();
    let signature = sign_payload(TEST_WEBHOOK_SECRET, &timestamp, &body);
    let header = format!("t={},v1={}", timestamp, signature);

    let response = app
        .request_raw(
            Method::POST,
            WEBHOOK_URI,
            body,
            &[("stripe-signature", header.as_str())],
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let orders = Order::find().all(&*app.state.db).await.expect("query orders");
    assert!(orders.is_empty());
}
