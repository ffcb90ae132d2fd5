use crate::{
    entities::{cart, cart_item, product, Cart, CartItem, Product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Shopping cart service.
///
/// Carts are keyed by an opaque client-supplied `cart_code` and created
/// lazily on the first add. Both the cart and its items use
/// lookup-or-create semantics backed by unique indexes, so re-adding a
/// product never duplicates a line.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// One cart line joined with its product, with the derived line total.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item: cart_item::Model,
    pub product: product::Model,
    pub line_total: Decimal,
}

/// A cart with its lines and aggregate total.
#[derive(Debug, Clone, Serialize)]
pub struct CartWithItems {
    pub cart: cart::Model,
    pub items: Vec<CartLine>,
    pub total: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddToCartInput {
    pub cart_code: String,
    pub product_id: Uuid,
    pub quantity: Option<i32>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Adds a product to the cart identified by `cart_code`, creating
    /// the cart on first use. Re-adding an existing product is a no-op
    /// on the existing line (idempotent lookup-or-create).
    #[instrument(skip(self))]
    pub async fn add_item(&self, input: AddToCartInput) -> Result<CartWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let product = Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let cart = match Cart::find()
            .filter(cart::Column::CartCode.eq(input.cart_code.as_str()))
            .one(&txn)
            .await?
        {
            Some(existing) => existing,
            None => {
                let cart_id = Uuid::new_v4();
                let created = cart::ActiveModel {
                    id: Set(cart_id),
                    cart_code: Set(input.cart_code.clone()),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?;

                self.event_sender
                    .send_or_log(Event::CartCreated {
                        cart_id,
                        cart_code: input.cart_code.clone(),
                    })
                    .await;
                created
            }
        };

        let existing_item = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product.id))
            .one(&txn)
            .await?;

        if existing_item.is_none() {
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                quantity: Set(input.quantity.unwrap_or(1).max(1)),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await?;
        }

        let cart_with_items = load_cart_with_items(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart_with_items.cart.id,
                product_id: product.id,
            })
            .await;

        info!(
            "Added product {} to cart {}",
            product.id, cart_with_items.cart.cart_code
        );
        Ok(cart_with_items)
    }

    /// Retrieves a cart with its items and totals.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, cart_code: &str) -> Result<CartWithItems, ServiceError> {
        let cart = Cart::find()
            .filter(cart::Column::CartCode.eq(cart_code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_code)))?;

        load_cart_with_items(&*self.db, cart).await
    }

    /// Sets the quantity of a cart item. A quantity of zero (or less)
    /// removes the line.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<Option<cart_item::Model>, ServiceError> {
        if quantity <= 0 {
            self.remove_item(item_id).await?;
            return Ok(None);
        }

        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        item.updated_at = Set(Utc::now());
        let updated = item.update(&*self.db).await?;

        Ok(Some(updated))
    }

    /// Removes a cart item outright.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        item.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_item_id: item_id,
            })
            .await;

        Ok(())
    }
}

/// Loads cart lines joined with products and computes totals. Shared
/// between the cart service and readbacks inside transactions.
pub(crate) async fn load_cart_with_items<C: ConnectionTrait>(
    conn: &C,
    cart: cart::Model,
) -> Result<CartWithItems, ServiceError> {
    let rows = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .find_also_related(Product)
        .order_by_asc(cart_item::Column::CreatedAt)
        .all(conn)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    let mut total = Decimal::ZERO;
    for (item, product) in rows {
        let product = product.ok_or_else(|| {
            ServiceError::NotFound(format!("Product {} no longer exists", item.product_id))
        })?;
        let line_total = product.price * Decimal::from(item.quantity);
        total += line_total;
        items.push(CartLine {
            item,
            product,
            line_total,
        });
    }

    Ok(CartWithItems { cart, items, total })
}
