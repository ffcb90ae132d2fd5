/// Stripe integration: outbound checkout-session creation and inbound
/// webhook signature verification. Both are constructed explicitly
/// from `AppConfig` and injected; there is no process-global client
/// state.
pub mod stripe;
pub mod webhook;

pub use stripe::{to_minor_units, CheckoutSession, CreateSessionParams, SessionLineItem, StripeClient};
pub use webhook::{StripeEvent, StripeSessionObject, WebhookVerifier};
