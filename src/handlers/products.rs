use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    entities::{category, product, review},
    errors::ServiceError,
    handlers::common::PaginationParams,
    services::catalog::ProductListQuery,
    AppState,
};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ProductFilterParams {
    /// Restrict the listing to featured products.
    pub featured: Option<bool>,
    /// Restrict the listing to one category by slug.
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchParams {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RatingSummary {
    pub count: usize,
    pub average: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    pub product: product::Model,
    pub reviews: Vec<review::Model>,
    pub rating: RatingSummary,
}

#[derive(Debug, Serialize)]
pub struct CategoryDetailResponse {
    pub category: category::Model,
    pub products: Vec<product::Model>,
}

fn summarize_ratings(reviews: &[review::Model]) -> RatingSummary {
    let count = reviews.len();
    let average = if count == 0 {
        None
    } else {
        let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
        Some(sum as f64 / count as f64)
    };
    RatingSummary { count, average }
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Product listing"),
        (status = 404, description = "Unknown category filter", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilterParams>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state
        .services
        .catalog
        .list_products(ProductListQuery {
            featured: filter.featured,
            category_slug: filter.category,
            page: Some(pagination.page),
            per_page: Some(pagination.per_page),
        })
        .await?;
    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching products"),
        (status = 400, description = "Missing or empty query", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let query = params
        .query
        .ok_or_else(|| ServiceError::BadRequest("No query provided".to_string()))?;
    let products = state.services.catalog.search_products(&query).await?;
    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/:slug",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product detail with reviews and rating summary"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.get_product_by_slug(&slug).await?;
    let reviews = state.services.reviews.list_for_product(product.id).await?;
    let rating = summarize_ratings(&reviews);
    Ok(Json(ProductDetailResponse {
        product,
        reviews,
        rating,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "All categories")),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/:slug",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category with its products"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let (category, products) = state
        .services
        .catalog
        .get_category_with_products(&slug)
        .await?;
    Ok(Json(CategoryDetailResponse { category, products }))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/search", get(search_products))
        .route("/:slug", get(get_product))
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/:slug", get(get_category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn review_with_rating(rating: i32) -> review::Model {
        review::Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            rating,
            review: "text".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rating_summary_averages_all_reviews() {
        let reviews = vec![
            review_with_rating(5),
            review_with_rating(4),
            review_with_rating(3),
        ];
        let summary = summarize_ratings(&reviews);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Some(4.0));
    }

    #[test]
    fn rating_summary_is_empty_without_reviews() {
        let summary = summarize_ratings(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average, None);
    }
}
