mod common;

use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use storefront_api::{
    entities::{cart, order, order_item, Cart, Order, OrderItem},
    payments::StripeEvent,
    services::{session_line_items, AddToCartInput, FulfillmentOutcome},
};

use common::TestApp;

fn checkout_event(session_id: &str, cart_code: Option<&str>, amount_total: i64) -> StripeEvent {
    let metadata = match cart_code {
        Some(code) => json!({ "cart_code": code }),
        None => json!({}),
    };
    serde_json::from_value(json!({
        "id": "evt_test",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "amount_total": amount_total,
                "currency": "usd",
                "customer_email": "shopper@example.com",
                "metadata": metadata
            }
        }
    }))
    .expect("valid checkout event")
}

async fn seed_cart(app: &TestApp, cart_code: &str) -> (uuid::Uuid, uuid::Uuid) {
    let shirt = app.seed_product(&format!("{cart_code}-shirt"), dec!(19.99)).await;
    let mug = app.seed_product(&format!("{cart_code}-mug"), dec!(5.00)).await;

    app.state
        .services
        .cart
        .add_item(AddToCartInput {
            cart_code: cart_code.to_string(),
            product_id: shirt.id,
            quantity: Some(1),
        })
        .await
        .expect("add shirt to cart");
    app.state
        .services
        .cart
        .add_item(AddToCartInput {
            cart_code: cart_code.to_string(),
            product_id: mug.id,
            quantity: Some(3),
        })
        .await
        .expect("add mugs to cart");

    (shirt.id, mug.id)
}

#[tokio::test]
async fn fulfillment_creates_the_order_and_consumes_the_cart() {
    let app = TestApp::new().await;
    let (shirt_id, mug_id) = seed_cart(&app, "fulfill-cart").await;

    // 19.99 * 1 + 5.00 * 3 in minor units
    let event = checkout_event("cs_fulfill_1", Some("fulfill-cart"), 3499);
    let outcome = app
        .state
        .services
        .checkout
        .fulfill_checkout(&event)
        .await
        .expect("fulfillment succeeds");

    let order = match outcome {
        FulfillmentOutcome::Fulfilled(order) => order,
        other => panic!("expected Fulfilled, got {:?}", other),
    };
    assert_eq!(order.stripe_checkout_id, "cs_fulfill_1");
    assert_eq!(order.amount, dec!(34.99));
    assert_eq!(order.currency, "usd");
    assert_eq!(order.status, order::OrderStatus::Paid);
    assert_eq!(order.customer_email.as_deref(), Some("shopper@example.com"));

    // Items were snapshotted with the price at fulfillment time.
    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .all(&*app.state.db)
        .await
        .expect("load order items");
    assert_eq!(items.len(), 2);

    let shirt_line = items
        .iter()
        .find(|i| i.product_id == shirt_id)
        .expect("shirt line");
    assert_eq!(shirt_line.quantity, 1);
    assert_eq!(shirt_line.unit_price, dec!(19.99));

    let mug_line = items
        .iter()
        .find(|i| i.product_id == mug_id)
        .expect("mug line");
    assert_eq!(mug_line.quantity, 3);
    assert_eq!(mug_line.unit_price, dec!(5.00));

    // The cart is gone after fulfillment.
    let remaining = Cart::find()
        .filter(cart::Column::CartCode.eq("fulfill-cart"))
        .one(&*app.state.db)
        .await
        .expect("query cart");
    assert!(remaining.is_none());
}

#[tokio::test]
async fn redelivered_events_never_create_a_second_order() {
    let app = TestApp::new().await;
    seed_cart(&app, "redelivery-cart").await;

    let event = checkout_event("cs_redelivery_1", Some("redelivery-cart"), 3499);

    let first = app
        .state
        .services
        .checkout
        .fulfill_checkout(&event)
        .await
        .expect("first delivery succeeds");
    assert!(matches!(first, FulfillmentOutcome::Fulfilled(_)));

    for _ in 0..3 {
        let again = app
            .state
            .services
            .checkout
            .fulfill_checkout(&event)
            .await
            .expect("redelivery is acknowledged");
        assert!(matches!(again, FulfillmentOutcome::AlreadyFulfilled));
    }

    let orders = Order::find()
        .filter(order::Column::StripeCheckoutId.eq("cs_redelivery_1"))
        .all(&*app.state.db)
        .await
        .expect("query orders");
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
async fn missing_cart_code_metadata_is_acknowledged_without_an_order() {
    let app = TestApp::new().await;

    let event = checkout_event("cs_no_metadata", None, 1000);
    let outcome = app
        .state
        .services
        .checkout
        .fulfill_checkout(&event)
        .await
        .expect("acknowledged");
    assert!(matches!(outcome, FulfillmentOutcome::MissingCartCode));

    let orders = Order::find().all(&*app.state.db).await.expect("query orders");
    assert!(orders.is_empty());
}

#[tokio::test]
async fn unknown_cart_is_treated_as_already_fulfilled() {
    let app = TestApp::new().await;

    let event = checkout_event("cs_vanished_cart", Some("never-existed"), 1000);
    let outcome = app
        .state
        .services
        .checkout
        .fulfill_checkout(&event)
        .await
        .expect("acknowledged");
    assert!(matches!(outcome, FulfillmentOutcome::AlreadyFulfilled));

    let orders = Order::find().all(&*app.state.db).await.expect("query orders");
    assert!(orders.is_empty());
}

#[tokio::test]
async fn fulfillment_failure_leaves_no_partial_order_behind() {
    let app = TestApp::new().await;
    let (shirt_id, _) = seed_cart(&app, "atomic-cart").await;

    // Break fulfillment midway: the cart still references a product
    // that no longer exists.
    storefront_api::entities::Product::delete_by_id(shirt_id)
        .exec(&*app.state.db)
        .await
        .expect("delete product");

    let event = checkout_event("cs_atomic_1", Some("atomic-cart"), 3499);
    let result = app.state.services.checkout.fulfill_checkout(&event).await;
    assert!(result.is_err());

    // Nothing committed: no order, and the cart survives for a retry.
    let orders = Order::find()
        .filter(order::Column::StripeCheckoutId.eq("cs_atomic_1"))
        .all(&*app.state.db)
        .await
        .expect("query orders");
    assert!(orders.is_empty());

    let remaining = Cart::find()
        .filter(cart::Column::CartCode.eq("atomic-cart"))
        .one(&*app.state.db)
        .await
        .expect("query cart");
    assert!(remaining.is_some());
}

#[tokio::test]
async fn checkout_session_for_empty_or_missing_cart_is_rejected() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .checkout
        .create_session("no-such-cart", "shopper@example.com")
        .await
        .expect_err("missing cart is rejected");
    assert!(err.to_string().contains("not found"));

    // A cart emptied out again is rejected before any provider call.
    let product = app.seed_product("emptied-product", dec!(9.99)).await;
    let cart = app
        .state
        .services
        .cart
        .add_item(AddToCartInput {
            cart_code: "emptied-cart".to_string(),
            product_id: product.id,
            quantity: Some(1),
        })
        .await
        .expect("add to cart");
    app.state
        .services
        .cart
        .remove_item(cart.items[0].item.id)
        .await
        .expect("remove the only line");

    let err = app
        .state
        .services
        .checkout
        .create_session("emptied-cart", "shopper@example.com")
        .await
        .expect_err("empty cart is rejected");
    assert!(err.to_string().contains("empty"));
}

#[tokio::test]
async fn session_line_items_preserve_the_order_products_were_added() {
    let app = TestApp::new().await;
    let shirt = app.seed_product("lineorder-shirt", dec!(19.99)).await;
    let mug = app.seed_product("lineorder-mug", dec!(5.00)).await;
    let poster = app.seed_product("lineorder-poster", dec!(12.50)).await;

    for (product, quantity) in [(&shirt, 1), (&mug, 3), (&poster, 2)] {
        app.state
            .services
            .cart
            .add_item(AddToCartInput {
                cart_code: "lineorder-cart".to_string(),
                product_id: product.id,
                quantity: Some(quantity),
            })
            .await
            .expect("add to cart");
    }

    let cart = app
        .state
        .services
        .cart
        .get_cart("lineorder-cart")
        .await
        .expect("load cart");
    let items = session_line_items(&cart).expect("build line items");

    let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Test Product lineorder-shirt",
            "Test Product lineorder-mug",
            "Test Product lineorder-poster",
        ]
    );
    assert_eq!(
        items.iter().map(|i| i.unit_amount).collect::<Vec<_>>(),
        vec![1999, 500, 1250]
    );
    assert_eq!(
        items.iter().map(|i| i.quantity).collect::<Vec<_>>(),
        vec![1, 3, 2]
    );
}
