use axum::{
    extract::State,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    errors::ServiceError,
    handlers::common::{created_response, validate_input},
    AppState,
};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 64, message = "cart_code must be 1-64 characters"))]
    pub cart_code: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreateSessionResponse {
    /// Provider session id.
    pub session_id: String,
    /// Hosted payment page to redirect the customer to.
    pub url: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/session",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = CreateSessionResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse),
        (status = 400, description = "Empty cart or invalid input", body = crate::errors::ErrorResponse),
        (status = 402, description = "Payment provider rejected the request", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let session = state
        .services
        .checkout
        .create_session(&payload.cart_code, &payload.email)
        .await?;

    Ok(created_response(CreateSessionResponse {
        session_id: session.id,
        url: session.url,
    }))
}

pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/session", post(create_checkout_session))
}
