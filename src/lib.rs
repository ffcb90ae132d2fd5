//! Storefront API
//!
//! Backend for a small online store: catalog, anonymous carts, reviews,
//! wishlists, and hosted-checkout payment with webhook-driven order
//! fulfillment.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod payments;
pub mod services;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::payments::WebhookVerifier;
use crate::services::AppServices;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub event_sender: Arc<EventSender>,
    pub services: AppServices,
    pub webhook_verifier: Arc<WebhookVerifier>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self, ServiceError> {
        let services = AppServices::new(db.clone(), event_sender.clone(), config.clone())?;
        let webhook_verifier = Arc::new(WebhookVerifier::from_config(&config));

        Ok(Self {
            db,
            config,
            event_sender,
            services,
            webhook_verifier,
        })
    }
}

/// All versioned API routes, nested under `/api/v1` by [`build_app`].
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::health::api_status))
        .nest("/products", handlers::products::product_routes())
        .nest("/categories", handlers::products::category_routes())
        .nest("/carts", handlers::carts::cart_routes())
        .nest("/reviews", handlers::reviews::review_routes())
        .nest("/wishlist", handlers::wishlist::wishlist_routes())
        .nest("/checkout", handlers::checkout::checkout_routes())
        .nest("/payments", handlers::webhooks::webhook_routes())
}

/// Assembles the full application router. Shared by `main` and the
/// integration tests so both exercise the same stack.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "storefront-api up" }))
        .merge(handlers::health::health_routes())
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
