use crate::payments::error::{PaymentError, PaymentResult};
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use sha2::Sha512;
use std::time::Duration;
use tracing::warn;

type HmacSha512 = Hmac<Sha512>;

/// Thin JSON client for gateway calls.
///
/// Requests are sent exactly once. Initializing a payment mints a new
/// reference every time, so retrying belongs to the user, not to this client.
#[derive(Clone)]
pub struct PaymentHttpClient {
    client: Client,
    timeout: Duration,
}

impl PaymentHttpClient {
    pub fn new(timeout: Duration) -> PaymentResult<Self> {
        let client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| PaymentError::NetworkError {
                    message: format!("failed to initialize HTTP client: {}", e),
                })?;

        Ok(Self { client, timeout })
    }

    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        bearer_token: Option<&str>,
        body: Option<&JsonValue>,
    ) -> PaymentResult<T> {
        let mut request = self.client.request(method, url).timeout(self.timeout);
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError {
                message: format!("provider request failed: {}", e),
            })?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if status.is_success() {
            return serde_json::from_str::<T>(&text).map_err(|e| PaymentError::ProviderError {
                provider: "http".to_string(),
                message: format!("invalid provider JSON response: {}", e),
                provider_code: None,
            });
        }

        if status.as_u16() == 429 {
            return Err(PaymentError::RateLimitError {
                message: "provider rate limit exceeded".to_string(),
            });
        }

        warn!(status = %status, url = %url, "provider returned non-success status");
        Err(PaymentError::ProviderError {
            provider: "http".to_string(),
            message: format!("HTTP {}: {}", status, text),
            provider_code: Some(status.as_u16().to_string()),
        })
    }
}

pub fn sign_hmac_sha512_hex(payload: &[u8], secret: &str) -> Option<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_hmac_sha512_hex(payload: &[u8], secret: &str, signature: &str) -> bool {
    match sign_hmac_sha512_hex(payload, secret) {
        Some(computed) => secure_eq(
            computed.as_bytes(),
            signature.trim().to_ascii_lowercase().as_bytes(),
        ),
        None => false,
    }
}

pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Rounds a major-unit amount to two decimal places (half-up).
///
/// This is the single rounding point between caller input and everything
/// downstream: the ledger stores this value and the gateway receives
/// exactly one hundred times it.
pub fn round_major_units(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

pub fn to_minor_units(amount: &BigDecimal) -> PaymentResult<i64> {
    let minor = (round_major_units(amount) * BigDecimal::from(100)).with_scale(0);
    if minor <= BigDecimal::zero() {
        return Err(PaymentError::validation(
            "amount must be greater than zero",
            "amount",
        ));
    }
    minor
        .to_i64()
        .ok_or_else(|| PaymentError::validation("amount is too large", "amount"))
}

pub fn to_major_units(minor: i64) -> BigDecimal {
    (BigDecimal::from(minor) / BigDecimal::from(100)).with_scale(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).expect("valid decimal")
    }

    #[test]
    fn minor_units_multiply_by_one_hundred() {
        assert_eq!(to_minor_units(&dec("5000")).unwrap(), 500_000);
        assert_eq!(to_minor_units(&dec("19.99")).unwrap(), 1_999);
        assert_eq!(to_minor_units(&dec("0.01")).unwrap(), 1);
    }

    #[test]
    fn minor_units_round_half_up_once() {
        assert_eq!(to_minor_units(&dec("10.005")).unwrap(), 1_001);
        assert_eq!(to_minor_units(&dec("10.004")).unwrap(), 1_000);
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        assert!(to_minor_units(&dec("0")).is_err());
        assert!(to_minor_units(&dec("0.001")).is_err());
        assert!(to_minor_units(&dec("-5")).is_err());
    }

    #[test]
    fn major_units_recover_two_decimal_amounts() {
        for raw in ["5000", "19.99", "0.10", "123456.78", "1"] {
            let amount = dec(raw);
            let minor = to_minor_units(&amount).unwrap();
            assert_eq!(to_major_units(minor), amount, "drift for {}", raw);
            assert_eq!(to_minor_units(&to_major_units(minor)).unwrap(), minor);
        }
    }

    #[test]
    fn hmac_signature_round_trip() {
        let payload = br#"{"event":"charge.success"}"#;
        let signature = sign_hmac_sha512_hex(payload, "sk_test").unwrap();
        assert_eq!(signature.len(), 128);
        assert!(verify_hmac_sha512_hex(payload, "sk_test", &signature));
        assert!(verify_hmac_sha512_hex(
            payload,
            "sk_test",
            &signature.to_uppercase()
        ));
        assert!(!verify_hmac_sha512_hex(payload, "sk_other", &signature));
        assert!(!verify_hmac_sha512_hex(
            br#"{"event":"charge.failed"}"#,
            "sk_test",
            &signature
        ));
    }

    #[test]
    fn secure_eq_works() {
        assert!(secure_eq(b"abc", b"abc"));
        assert!(!secure_eq(b"abc", b"abd"));
        assert!(!secure_eq(b"abc", b"abcd"));
    }
}
