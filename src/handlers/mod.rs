pub mod carts;
pub mod checkout;
pub mod common;
pub mod health;
pub mod products;
pub mod reviews;
pub mod webhooks;
pub mod wishlist;
