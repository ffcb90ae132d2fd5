use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    handlers::common::{created_response, no_content_response, validate_input},
    services::AddToCartInput,
    AppState,
};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct AddItemRequest {
    #[validate(length(min = 1, max = 64, message = "cart_code must be 1-64 characters"))]
    pub cart_code: String,
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

#[utoipa::path(
    post,
    path = "/api/v1/carts/items",
    request_body = AddItemRequest,
    responses(
        (status = 201, description = "Item added, cart returned"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Carts"
)]
pub async fn add_item(
    State(state): State<AppState>,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .cart
        .add_item(AddToCartInput {
            cart_code: payload.cart_code,
            product_id: payload.product_id,
            quantity: payload.quantity,
        })
        .await?;
    Ok(created_response(cart))
}

#[utoipa::path(
    get,
    path = "/api/v1/carts/:cart_code",
    params(("cart_code" = String, Path, description = "Opaque cart code")),
    responses(
        (status = 200, description = "Cart with items and totals"),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Carts"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(cart_code): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.cart.get_cart(&cart_code).await?;
    Ok(Json(cart))
}

#[utoipa::path(
    put,
    path = "/api/v1/carts/items/:item_id",
    params(("item_id" = Uuid, Path, description = "Cart item id")),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Quantity updated"),
        (status = 204, description = "Item removed (quantity <= 0)"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Carts"
)]
pub async fn update_item_quantity(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    match state
        .services
        .cart
        .update_item_quantity(item_id, payload.quantity)
        .await?
    {
        Some(item) => Ok(Json(item).into_response()),
        None => Ok(no_content_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/carts/items/:item_id",
    params(("item_id" = Uuid, Path, description = "Cart item id")),
    responses(
        (status = 204, description = "Item removed"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Carts"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.cart.remove_item(item_id).await?;
    Ok(no_content_response())
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/items", post(add_item))
        .route("/items/:item_id", put(update_item_quantity))
        .route("/items/:item_id", delete(remove_item))
        .route("/:cart_code", get(get_cart))
}
