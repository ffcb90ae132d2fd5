use crate::{
    entities::{customer, wishlist, Customer, Product, Wishlist},
    errors::ServiceError,
    events::{Event, EventSender},
    services::reviews::get_or_create_customer,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Customer wishlists keyed by email. Adding a product that is already
/// present removes it instead, so one endpoint serves both directions.
#[derive(Clone)]
pub struct WishlistService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Result of a wishlist toggle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WishlistToggle {
    Added { entry: wishlist::Model },
    Removed,
}

impl WishlistService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Toggles a product on the wishlist of the customer with this
    /// email, creating the customer on first contact.
    #[instrument(skip(self))]
    pub async fn toggle(
        &self,
        email: &str,
        product_id: Uuid,
    ) -> Result<WishlistToggle, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let customer = get_or_create_customer(&*self.db, email).await?;

        let existing = Wishlist::find()
            .filter(wishlist::Column::CustomerId.eq(customer.id))
            .filter(wishlist::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;

        match existing {
            Some(entry) => {
                entry.delete(&*self.db).await?;
                self.event_sender
                    .send_or_log(Event::WishlistRemoved {
                        customer_id: customer.id,
                        product_id,
                    })
                    .await;
                info!(
                    "Removed product {} from wishlist of customer {}",
                    product_id, customer.id
                );
                Ok(WishlistToggle::Removed)
            }
            None => {
                let entry = wishlist::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    customer_id: Set(customer.id),
                    product_id: Set(product_id),
                    created_at: Set(Utc::now()),
                }
                .insert(&*self.db)
                .await?;

                self.event_sender
                    .send_or_log(Event::WishlistAdded {
                        customer_id: customer.id,
                        product_id,
                    })
                    .await;
                info!(
                    "Added product {} to wishlist of customer {}",
                    product_id, customer.id
                );
                Ok(WishlistToggle::Added { entry })
            }
        }
    }

    /// Lists the wishlist entries for an email, with their products,
    /// newest first. An email nobody has used yet is a `NotFound`.
    #[instrument(skip(self))]
    pub async fn list_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<(wishlist::Model, crate::entities::ProductModel)>, ServiceError> {
        let customer = Customer::find()
            .filter(customer::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", email)))?;

        let rows = Wishlist::find()
            .filter(wishlist::Column::CustomerId.eq(customer.id))
            .find_also_related(Product)
            .order_by_desc(wishlist::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for (entry, product) in rows {
            let product = product.ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} no longer exists", entry.product_id))
            })?;
            entries.push((entry, product));
        }
        Ok(entries)
    }
}
