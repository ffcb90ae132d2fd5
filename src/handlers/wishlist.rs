use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{product, wishlist},
    errors::ServiceError,
    handlers::common::{created_response, validate_input},
    services::WishlistToggle,
    AppState,
};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ToggleWishlistRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct WishlistQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct WishlistEntryResponse {
    pub entry: wishlist::Model,
    pub product: product::Model,
}

#[utoipa::path(
    post,
    path = "/api/v1/wishlist",
    request_body = ToggleWishlistRequest,
    responses(
        (status = 201, description = "Product added to the wishlist"),
        (status = 200, description = "Product removed from the wishlist"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Wishlist"
)]
pub async fn toggle_wishlist(
    State(state): State<AppState>,
    Json(payload): Json<ToggleWishlistRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let outcome = state
        .services
        .wishlist
        .toggle(&payload.email, payload.product_id)
        .await?;

    match &outcome {
        WishlistToggle::Added { .. } => Ok(created_response(outcome)),
        WishlistToggle::Removed => Ok(Json(outcome).into_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/wishlist",
    params(WishlistQuery),
    responses(
        (status = 200, description = "Wishlist entries with products"),
        (status = 404, description = "Unknown email", body = crate::errors::ErrorResponse)
    ),
    tag = "Wishlist"
)]
pub async fn list_wishlist(
    State(state): State<AppState>,
    Query(params): Query<WishlistQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let entries = state.services.wishlist.list_by_email(&params.email).await?;
    let body: Vec<WishlistEntryResponse> = entries
        .into_iter()
        .map(|(entry, product)| WishlistEntryResponse { entry, product })
        .collect();
    Ok(Json(body))
}

pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(toggle_wishlist))
        .route("/", get(list_wishlist))
}
