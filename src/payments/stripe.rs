use crate::config::AppConfig;
use crate::errors::ServiceError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

/// One hosted-checkout line item: integer minor units plus quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionLineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: i64,
}

/// Parameters for creating a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub customer_email: String,
    pub currency: String,
    pub line_items: Vec<SessionLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    /// Attached as session metadata so the asynchronous webhook can
    /// locate the cart later.
    pub cart_code: String,
}

/// Checkout session returned by Stripe. `url` is the redirect target
/// for the hosted payment page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    message: Option<String>,
}

/// Thin client over Stripe's checkout-session API. Holds the secret
/// key; every outbound call carries an explicit timeout and no retry
/// (webhook redelivery is the provider's job, session creation errors
/// surface straight to the caller).
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: String, api_base: String, timeout: Duration) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            api_base,
            secret_key,
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            cfg.stripe_secret_key.clone(),
            cfg.stripe_api_base.clone(),
            Duration::from_secs(cfg.stripe_timeout_secs),
        )
    }

    /// Creates a hosted checkout session. Provider rejections come back
    /// as `ServiceError::PaymentError` carrying the provider's message.
    #[instrument(skip(self, params), fields(cart_code = %params.cart_code))]
    pub async fn create_checkout_session(
        &self,
        params: &CreateSessionParams,
    ) -> Result<CheckoutSession, ServiceError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        let form = encode_session_form(params);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(&form)
            .send()
            .await
            .map_err(|e| ServiceError::PaymentError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| format!("provider returned HTTP {}", status));
            return Err(ServiceError::PaymentError(message));
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| ServiceError::PaymentError(format!("invalid session response: {}", e)))?;

        info!(session_id = %session.id, "Created checkout session");
        Ok(session)
    }
}

/// Flattens session parameters into Stripe's indexed form encoding.
fn encode_session_form(params: &CreateSessionParams) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("customer_email".to_string(), params.customer_email.clone()),
        ("success_url".to_string(), params.success_url.clone()),
        ("cancel_url".to_string(), params.cancel_url.clone()),
        (
            "payment_method_types[0]".to_string(),
            "card".to_string(),
        ),
        (
            "metadata[cart_code]".to_string(),
            params.cart_code.clone(),
        ),
    ];

    for (i, item) in params.line_items.iter().enumerate() {
        form.push((
            format!("line_items[{}][price_data][currency]", i),
            params.currency.clone(),
        ));
        form.push((
            format!("line_items[{}][price_data][product_data][name]", i),
            item.name.clone(),
        ));
        form.push((
            format!("line_items[{}][price_data][unit_amount]", i),
            item.unit_amount.to_string(),
        ));
        form.push((format!("line_items[{}][quantity]", i), item.quantity.to_string()));
    }

    form
}

/// Converts a decimal price in major currency units to integer minor
/// units. Rounds (half-up at the cent boundary) rather than truncating,
/// so 19.999 becomes 2000, not 1999.
pub fn to_minor_units(price: Decimal) -> Result<i64, ServiceError> {
    let cents = (price * Decimal::ONE_HUNDRED).round();
    cents.to_i64().ok_or_else(|| {
        ServiceError::InvalidOperation(format!("price {} out of range for minor units", price))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minor_units_round_instead_of_truncating() {
        assert_eq!(to_minor_units(dec!(19.99)).unwrap(), 1999);
        assert_eq!(to_minor_units(dec!(5.00)).unwrap(), 500);
        assert_eq!(to_minor_units(dec!(19.999)).unwrap(), 2000);
        assert_eq!(to_minor_units(dec!(0.004)).unwrap(), 0);
        assert_eq!(to_minor_units(dec!(0)).unwrap(), 0);
    }

    #[test]
    fn session_form_preserves_line_item_order() {
        let params = CreateSessionParams {
            customer_email: "shopper@example.com".into(),
            currency: "usd".into(),
            line_items: vec![
                SessionLineItem {
                    name: "ProductA".into(),
                    unit_amount: 1999,
                    quantity: 1,
                },
                SessionLineItem {
                    name: "ProductB".into(),
                    unit_amount: 500,
                    quantity: 3,
                },
            ],
            success_url: "http://localhost:3000/success".into(),
            cancel_url: "http://localhost:3000/cancel".into(),
            cart_code: "abc123".into(),
        };

        let form = encode_session_form(&params);
        let lookup = |k: &str| {
            form.iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(lookup("metadata[cart_code]"), Some("abc123"));
        assert_eq!(
            lookup("line_items[0][price_data][unit_amount]"),
            Some("1999")
        );
        assert_eq!(lookup("line_items[0][quantity]"), Some("1"));
        assert_eq!(
            lookup("line_items[1][price_data][unit_amount]"),
            Some("500")
        );
        assert_eq!(lookup("line_items[1][quantity]"), Some("3"));
        assert_eq!(
            lookup("line_items[1][price_data][currency]"),
            Some("usd")
        );
    }
}
