use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the service layer. Consumed in-process by a
/// logging task; the channel seam is where outbound integrations
/// (notification webhooks, analytics) would attach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CartCreated {
        cart_id: Uuid,
        cart_code: String,
    },
    CartItemAdded {
        cart_id: Uuid,
        product_id: Uuid,
    },
    CartItemRemoved {
        cart_item_id: Uuid,
    },
    CheckoutSessionCreated {
        cart_code: String,
        session_id: String,
    },
    OrderFulfilled {
        order_id: Uuid,
        checkout_id: String,
    },
    ReviewAdded {
        review_id: Uuid,
        product_id: Uuid,
    },
    WishlistAdded {
        customer_id: Uuid,
        product_id: Uuid,
    },
    WishlistRemoved {
        customer_id: Uuid,
        product_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging (rather than propagating) a full or
    /// closed channel. Event delivery is best-effort and must never
    /// fail the request that produced it.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

/// Consumes events from the channel and logs them.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderFulfilled {
                order_id,
                checkout_id,
            } => {
                info!(%order_id, %checkout_id, "Order fulfilled");
            }
            Event::CheckoutSessionCreated {
                cart_code,
                session_id,
            } => {
                info!(%cart_code, %session_id, "Checkout session created");
            }
            other => {
                info!(event = ?other, "Event processed");
            }
        }
    }
    info!("Event channel closed; event processor exiting");
}
