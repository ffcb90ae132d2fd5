use crate::{
    config::AppConfig,
    entities::{cart, cart_item, order, order_item, Cart, CartItem, Order, Product},
    errors::ServiceError,
    events::{Event, EventSender},
    payments::{
        to_minor_units, CreateSessionParams, CheckoutSession, SessionLineItem, StripeClient,
        StripeEvent,
    },
    services::cart::{load_cart_with_items, CartWithItems},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Checkout: hands carts to the payment provider and materializes
/// orders when the provider confirms payment.
///
/// Fulfillment is guarded twice against webhook redelivery: a
/// pre-insert lookup on `stripe_checkout_id`, and the unique index on
/// that column for the window where two deliveries race past the
/// lookup together.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    stripe: Arc<StripeClient>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

/// Outcome of processing a completed-checkout event. Every variant maps
/// to an acknowledged delivery; only errors make the provider retry.
#[derive(Debug)]
pub enum FulfillmentOutcome {
    /// A new order was created from the cart.
    Fulfilled(order::Model),
    /// The session was already fulfilled (or its cart already cleaned
    /// up) by an earlier delivery.
    AlreadyFulfilled,
    /// The session carried no `cart_code` metadata, so there is nothing
    /// to fulfill. Logged and acknowledged.
    MissingCartCode,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        stripe: Arc<StripeClient>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            stripe,
            event_sender,
            config,
        }
    }

    /// Creates a hosted payment session for the cart. The cart must
    /// exist and be non-empty; its code travels in session metadata so
    /// the webhook can find it again.
    #[instrument(skip(self), fields(cart_code = %cart_code))]
    pub async fn create_session(
        &self,
        cart_code: &str,
        customer_email: &str,
    ) -> Result<CheckoutSession, ServiceError> {
        let cart = Cart::find()
            .filter(cart::Column::CartCode.eq(cart_code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_code)))?;

        let cart = load_cart_with_items(&*self.db, cart).await?;
        let line_items = session_line_items(&cart)?;

        let params = CreateSessionParams {
            customer_email: customer_email.to_string(),
            currency: self.config.default_currency.clone(),
            line_items,
            success_url: self.config.checkout_success_url.clone(),
            cancel_url: self.config.checkout_cancel_url.clone(),
            cart_code: cart_code.to_string(),
        };

        let session = self.stripe.create_checkout_session(&params).await?;

        self.event_sender
            .send_or_log(Event::CheckoutSessionCreated {
                cart_code: cart_code.to_string(),
                session_id: session.id.clone(),
            })
            .await;

        info!("Created checkout session {} for cart {}", session.id, cart_code);
        Ok(session)
    }

    /// Fulfills a verified completed-checkout event: creates the order
    /// with its item snapshots and deletes the cart, all in one
    /// transaction. Safe to call any number of times per session.
    #[instrument(skip(self, event), fields(session_id = %event.data.object.id))]
    pub async fn fulfill_checkout(
        &self,
        event: &StripeEvent,
    ) -> Result<FulfillmentOutcome, ServiceError> {
        let session = &event.data.object;

        let cart_code = match session.cart_code() {
            Some(code) => code.to_string(),
            None => {
                warn!(
                    "Checkout session {} carries no cart_code metadata; nothing to fulfill",
                    session.id
                );
                return Ok(FulfillmentOutcome::MissingCartCode);
            }
        };

        // Fast path for redelivered events.
        if Order::find()
            .filter(order::Column::StripeCheckoutId.eq(session.id.as_str()))
            .one(&*self.db)
            .await?
            .is_some()
        {
            info!("Checkout session {} already fulfilled", session.id);
            return Ok(FulfillmentOutcome::AlreadyFulfilled);
        }

        // A missing cart after a redelivery means the first delivery
        // already consumed it.
        let cart = match Cart::find()
            .filter(cart::Column::CartCode.eq(cart_code.as_str()))
            .one(&*self.db)
            .await?
        {
            Some(cart) => cart,
            None => {
                info!(
                    "Cart {} for session {} no longer exists; treating as fulfilled",
                    cart_code, session.id
                );
                return Ok(FulfillmentOutcome::AlreadyFulfilled);
            }
        };

        let txn = self.db.begin().await?;

        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            stripe_checkout_id: Set(session.id.clone()),
            amount: Set(Decimal::new(session.amount_total.unwrap_or_default(), 2)),
            currency: Set(session
                .currency
                .clone()
                .unwrap_or_else(|| self.config.default_currency.clone())),
            status: Set(order::OrderStatus::Paid),
            customer_email: Set(session.customer_email.clone()),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        materialize_order_items(&txn, order.id, cart.id).await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        cart.delete(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderFulfilled {
                order_id: order.id,
                checkout_id: order.stripe_checkout_id.clone(),
            })
            .await;

        info!(
            "Fulfilled checkout session {} into order {}",
            order.stripe_checkout_id, order.id
        );
        Ok(FulfillmentOutcome::Fulfilled(order))
    }
}

/// Builds provider line items from loaded cart lines, preserving the
/// order the products were added to the cart.
pub fn session_line_items(cart: &CartWithItems) -> Result<Vec<SessionLineItem>, ServiceError> {
    if cart.items.is_empty() {
        return Err(ServiceError::InvalidOperation("Cart is empty".to_string()));
    }

    let mut line_items = Vec::with_capacity(cart.items.len());
    for line in &cart.items {
        line_items.push(SessionLineItem {
            name: line.product.name.clone(),
            unit_amount: to_minor_units(line.product.price)?,
            quantity: i64::from(line.item.quantity),
        });
    }
    Ok(line_items)
}

/// Copies cart lines into order items, snapshotting the unit price at
/// fulfillment time.
async fn materialize_order_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    cart_id: Uuid,
) -> Result<(), ServiceError> {
    let rows = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .find_also_related(Product)
        .all(conn)
        .await?;

    for (item, product) in rows {
        let product = product.ok_or_else(|| {
            ServiceError::NotFound(format!("Product {} no longer exists", item.product_id))
        })?;

        order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(product.id),
            quantity: Set(item.quantity),
            unit_price: Set(product.price),
        }
        .insert(conn)
        .await?;
    }

    Ok(())
}
