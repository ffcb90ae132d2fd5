use crate::config::AppConfig;
use crate::errors::ServiceError;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Event types that trigger fulfillment.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const CHECKOUT_ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";

/// A verified, parsed Stripe event.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

impl StripeEvent {
    /// True for the event types that complete a checkout.
    pub fn is_checkout_completed(&self) -> bool {
        self.event_type == CHECKOUT_COMPLETED
            || self.event_type == CHECKOUT_ASYNC_PAYMENT_SUCCEEDED
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: StripeSessionObject,
}

/// The checkout-session object carried in a completed-payment event.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSessionObject {
    pub id: String,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    /// Echoed back by the provider as a top-level session field, not
    /// inside `metadata`.
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StripeSessionObject {
    pub fn cart_code(&self) -> Option<&str> {
        self.metadata.get("cart_code").map(String::as_str)
    }
}

/// Verifies that inbound webhook payloads genuinely originate from the
/// payment provider. Stateless: signature over the exact raw bytes,
/// timestamp tolerance against replay, constant-time comparison.
///
/// Both malformed payloads and signature mismatches come back as the
/// same generic `BadRequest` so callers cannot probe which check
/// failed.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: u64,
}

impl WebhookVerifier {
    pub fn new(secret: String, tolerance_secs: u64) -> Self {
        Self {
            secret,
            tolerance_secs,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.stripe_webhook_secret.clone(),
            cfg.stripe_webhook_tolerance_secs,
        )
    }

    /// Verifies the `Stripe-Signature` header against the raw body and
    /// parses the trusted event on success.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<StripeEvent, ServiceError> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Verification with an injectable clock.
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<StripeEvent, ServiceError> {
        let (timestamp, candidate) = parse_signature_header(signature_header)
            .ok_or_else(|| self.rejection("missing or malformed signature header"))?;

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| self.rejection("non-numeric signature timestamp"))?;
        if (now - ts).unsigned_abs() > self.tolerance_secs {
            return Err(self.rejection("signature timestamp outside tolerance"));
        }

        let expected = sign_payload(&self.secret, timestamp, payload);
        if !constant_time_eq(&expected, candidate) {
            return Err(self.rejection("signature mismatch"));
        }

        serde_json::from_slice(payload).map_err(|_| self.rejection("unparseable event payload"))
    }

    fn rejection(&self, reason: &str) -> ServiceError {
        // Log the real reason for operators; the client sees only a
        // generic 400 to avoid acting as a verification oracle.
        warn!("Webhook rejected: {}", reason);
        ServiceError::BadRequest("invalid webhook request".to_string())
    }
}

/// Extracts (t, v1) from a `Stripe-Signature` header: `t=<ts>,v1=<hex>`.
fn parse_signature_header(header: &str) -> Option<(&str, &str)> {
    let mut timestamp = None;
    let mut v1 = None;
    for part in header.split(',') {
        let mut it = part.trim().splitn(2, '=');
        match (it.next(), it.next()) {
            (Some("t"), Some(val)) => timestamp = Some(val),
            (Some("v1"), Some(val)) => v1 = Some(val),
            _ => {}
        }
    }
    Some((timestamp?, v1?))
}

/// HMAC-SHA256 over `"{timestamp}.{payload}"`, hex-encoded. Also used
/// by tests to produce valid signatures.
pub fn sign_payload(secret: &str, timestamp: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn event_body() -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_123",
                    "amount_total": 3499,
                    "currency": "usd",
                    "customer_email": "shopper@example.com",
                    "metadata": {"cart_code": "abc123"}
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    fn header_for(body: &[u8], ts: i64) -> String {
        let sig = sign_payload(SECRET, &ts.to_string(), body);
        format!("t={},v1={}", ts, sig)
    }

    #[test]
    fn valid_signature_yields_trusted_event() {
        let verifier = WebhookVerifier::new(SECRET.to_string(), 300);
        let body = event_body();
        let now = 1_700_000_000;

        let event = verifier
            .verify_at(&body, &header_for(&body, now), now)
            .expect("valid signature should verify");

        assert!(event.is_checkout_completed());
        assert_eq!(event.data.object.id, "cs_test_123");
        assert_eq!(event.data.object.cart_code(), Some("abc123"));
        assert_eq!(event.data.object.amount_total, Some(3499));
        assert_eq!(
            event.data.object.customer_email.as_deref(),
            Some("shopper@example.com")
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET.to_string(), 300);
        let body = event_body();
        let now = 1_700_000_000;
        let header = header_for(&body, now);

        let mut tampered = body.clone();
        // Flip one byte; the signature covers the exact byte sequence.
        tampered[10] ^= 0x01;

        let err = verifier.verify_at(&tampered, &header, now).unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET.to_string(), 300);
        let body = event_body();
        let now = 1_700_000_000;
        let mut header = header_for(&body, now);

        // Mutate one hex digit of v1
        let last = header.pop().unwrap();
        header.push(if last == '0' { '1' } else { '0' });

        assert!(verifier.verify_at(&body, &header, now).is_err());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET.to_string(), 300);
        let body = event_body();
        let signed_at = 1_700_000_000;
        let header = header_for(&body, signed_at);

        assert!(verifier
            .verify_at(&body, &header, signed_at + 301)
            .is_err());
        assert!(verifier
            .verify_at(&body, &header, signed_at + 299)
            .is_ok());
    }

    #[test]
    fn malformed_header_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET.to_string(), 300);
        let body = event_body();

        assert!(verifier.verify_at(&body, "", 0).is_err());
        assert!(verifier.verify_at(&body, "t=abc", 0).is_err());
        assert!(verifier.verify_at(&body, "v1=deadbeef", 0).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let verifier = WebhookVerifier::new("whsec_other".to_string(), 300);
        let body = event_body();
        let now = 1_700_000_000;

        assert!(verifier
            .verify_at(&body, &header_for(&body, now), now)
            .is_err());
    }
}
