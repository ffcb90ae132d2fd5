use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    handlers::common::{created_response, no_content_response, validate_input},
    services::reviews::{AddReviewInput, UpdateReviewInput},
    AppState,
};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct AddReviewRequest {
    pub product_id: Uuid,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(min = 1, message = "Review text cannot be empty"))]
    pub review: String,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(min = 1, message = "Review text cannot be empty"))]
    pub review: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    request_body = AddReviewRequest,
    responses(
        (status = 201, description = "Review created"),
        (status = 409, description = "Customer already reviewed this product", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Reviews"
)]
pub async fn add_review(
    State(state): State<AppState>,
    Json(payload): Json<AddReviewRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let review = state
        .services
        .reviews
        .add_review(AddReviewInput {
            product_id: payload.product_id,
            email: payload.email,
            rating: payload.rating,
            review: payload.review,
        })
        .await?;
    Ok(created_response(review))
}

#[utoipa::path(
    put,
    path = "/api/v1/reviews/:id",
    params(("id" = Uuid, Path, description = "Review id")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated"),
        (status = 404, description = "Review not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Reviews"
)]
pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let review = state
        .services
        .reviews
        .update_review(
            id,
            UpdateReviewInput {
                rating: payload.rating,
                review: payload.review,
            },
        )
        .await?;
    Ok(Json(review))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reviews/:id",
    params(("id" = Uuid, Path, description = "Review id")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 404, description = "Review not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Reviews"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.reviews.delete_review(id).await?;
    Ok(no_content_response())
}

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(add_review))
        .route("/:id", put(update_review))
        .route("/:id", delete(delete_review))
}
