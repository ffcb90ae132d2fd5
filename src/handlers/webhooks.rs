use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use bytes::Bytes;
use tracing::info;

use crate::{errors::ServiceError, services::FulfillmentOutcome, AppState};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Payment provider webhook. Signature verification runs over the raw
/// request bytes before any parsing; every rejection is a generic 400.
/// A verified delivery is always acknowledged with 200 unless
/// fulfillment itself fails, in which case the 500 makes the provider
/// redeliver.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Invalid webhook request", body = crate::errors::ErrorResponse)
    ),
    tag = "Webhooks"
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::BadRequest("invalid webhook request".to_string()))?;

    let event = state.webhook_verifier.verify(&body, signature)?;

    if !event.is_checkout_completed() {
        info!("Ignoring webhook event type {}", event.event_type);
        return Ok(StatusCode::OK);
    }

    match state.services.checkout.fulfill_checkout(&event).await? {
        FulfillmentOutcome::Fulfilled(order) => {
            info!("Webhook {} fulfilled order {}", event.id, order.id);
        }
        FulfillmentOutcome::AlreadyFulfilled => {
            info!("Webhook {} was a redelivery; nothing to do", event.id);
        }
        FulfillmentOutcome::MissingCartCode => {}
    }

    Ok(StatusCode::OK)
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(stripe_webhook))
}
