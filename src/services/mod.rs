pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod reviews;
pub mod wishlist;

pub use cart::{AddToCartInput, CartService, CartWithItems};
pub use catalog::CatalogService;
pub use checkout::{session_line_items, CheckoutService, FulfillmentOutcome};
pub use reviews::{AddReviewInput, ReviewService};
pub use wishlist::{WishlistService, WishlistToggle};

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::payments::StripeClient;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Aggregated services handed to HTTP handlers via `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub cart: Arc<CartService>,
    pub catalog: Arc<CatalogService>,
    pub checkout: Arc<CheckoutService>,
    pub reviews: Arc<ReviewService>,
    pub wishlist: Arc<WishlistService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Result<Self, ServiceError> {
        let stripe = Arc::new(StripeClient::from_config(&config)?);

        Ok(Self {
            cart: Arc::new(CartService::new(db.clone(), event_sender.clone())),
            catalog: Arc::new(CatalogService::new(db.clone())),
            checkout: Arc::new(CheckoutService::new(
                db.clone(),
                stripe,
                event_sender.clone(),
                config,
            )),
            reviews: Arc::new(ReviewService::new(db.clone(), event_sender.clone())),
            wishlist: Arc::new(WishlistService::new(db, event_sender)),
        })
    }
}
