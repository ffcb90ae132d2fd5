use crate::{
    entities::{customer, review, Customer, Product, Review},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Product reviews, one per (product, customer). Customers are
/// identified by email and created lazily on first contact.
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddReviewInput {
    pub product_id: Uuid,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(min = 1, message = "Review text cannot be empty"))]
    pub review: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateReviewInput {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(min = 1, message = "Review text cannot be empty"))]
    pub review: String,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Adds a review. A second review from the same customer for the
    /// same product is rejected with a conflict.
    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn add_review(&self, input: AddReviewInput) -> Result<review::Model, ServiceError> {
        input
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        Product::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let customer = get_or_create_customer(&*self.db, &input.email).await?;

        let existing = Review::find()
            .filter(review::Column::ProductId.eq(input.product_id))
            .filter(review::Column::CustomerId.eq(customer.id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Customer has already reviewed this product".to_string(),
            ));
        }

        let review = review::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(input.product_id),
            customer_id: Set(customer.id),
            rating: Set(input.rating),
            review: Set(input.review),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::ReviewAdded {
                review_id: review.id,
                product_id: review.product_id,
            })
            .await;

        info!("Added review {} for product {}", review.id, review.product_id);
        Ok(review)
    }

    /// Lists a product's reviews, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<review::Model>, ServiceError> {
        let reviews = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .order_by_desc(review::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(reviews)
    }

    /// Updates a review's rating and text in place.
    #[instrument(skip(self, input))]
    pub async fn update_review(
        &self,
        review_id: Uuid,
        input: UpdateReviewInput,
    ) -> Result<review::Model, ServiceError> {
        input
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let review = Review::find_by_id(review_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {} not found", review_id)))?;

        let mut review: review::ActiveModel = review.into();
        review.rating = Set(input.rating);
        review.review = Set(input.review);
        review.updated_at = Set(Utc::now());
        let updated = review.update(&*self.db).await?;

        Ok(updated)
    }

    /// Deletes a review.
    #[instrument(skip(self))]
    pub async fn delete_review(&self, review_id: Uuid) -> Result<(), ServiceError> {
        let review = Review::find_by_id(review_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {} not found", review_id)))?;

        review.delete(&*self.db).await?;
        Ok(())
    }
}

/// Resolves a customer by email, creating the record on first contact.
pub(crate) async fn get_or_create_customer<C: ConnectionTrait>(
    conn: &C,
    email: &str,
) -> Result<customer::Model, ServiceError> {
    if let Some(existing) = Customer::find()
        .filter(customer::Column::Email.eq(email))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let created = customer::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        first_name: Set(None),
        last_name: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(created)
}
