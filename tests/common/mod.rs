// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_api::{
    config::AppConfig,
    db,
    entities::{category, product},
    events::EventSender,
    payments::webhook::sign_payload,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret_for_integration_tests";

/// Harness wrapping the full application router over a throwaway SQLite
/// database. Each instance owns its own database file so tests can run
/// in parallel.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    db_file: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Constructs a fresh application with migrations applied.
    pub async fn new() -> Self {
        let db_file = format!("storefront_test_{}.db", Uuid::new_v4().simple());
        let _ = std::fs::remove_file(&db_file);

        let mut cfg = AppConfig::new(
            format!("sqlite://{db_file}?mode=rwc"),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
            "sk_test_key".to_string(),
            TEST_WEBHOOK_SECRET.to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_task = tokio::spawn(storefront_api::events::process_events(event_rx));

        let state = AppState::new(
            Arc::new(pool),
            Arc::new(cfg),
            Arc::new(EventSender::new(event_tx)),
        )
        .expect("failed to build app state");

        let router = storefront_api::build_app(state.clone());

        Self {
            router,
            state,
            db_file,
            _event_task: event_task,
        }
    }

    /// Sends a JSON request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a raw-body request with arbitrary headers, for webhook
    /// deliveries where the exact bytes matter.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: Vec<u8>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder
            .body(Body::from(body))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn seed_product(&self, slug: &str, price: Decimal) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(format!("Test Product {}", slug)),
            slug: Set(slug.to_string()),
            description: Set("Seeded for integration tests".to_string()),
            price: Set(price),
            image_url: Set(None),
            featured: Set(false),
            category_id: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product for tests")
    }

    pub async fn seed_category(&self, slug: &str) -> category::Model {
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(format!("Category {}", slug)),
            slug: Set(slug.to_string()),
            image_url: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed category for tests")
    }

}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
        let _ = std::fs::remove_file(&self.db_file);
    }
}

/// Builds a checkout.session.completed payload and a valid signature
/// header for it, signed with [`TEST_WEBHOOK_SECRET`].
pub fn signed_checkout_event(
    session_id: &str,
    cart_code: Option<&str>,
    amount_total: i64,
) -> (Vec<u8>, String) {
    let metadata = match cart_code {
        Some(code) => serde_json::json!({ "cart_code": code }),
        None => serde_json::json!({}),
    };
    let payload = serde_json::json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "amount_total": amount_total,
                "currency": "usd",
                "metadata": metadata
            }
        }
    });
    let body = serde_json::to_vec(&payload).expect("serialize webhook payload");

    let timestamp = Utc::now().timestamp().to_string();
    let signature = sign_payload(TEST_WEBHOOK_SECRET, &timestamp, &body);
    let header = format!("t={},v1={}", timestamp, signature);

    (body, header)
}
