use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::PaymentGateway;
use crate::payments::types::{
    order_id_from_metadata, parse_gateway_timestamp, GatewayStatus, InitializeRequest,
    InitializeResponse, VerifyResponse, WebhookVerificationResult,
};
use crate::payments::utils::{verify_hmac_sha512_hex, PaymentHttpClient};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{info, warn};

pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";

#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub secret_key: String,
    pub webhook_secret: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for PaystackConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            webhook_secret: None,
            base_url: "https://api.paystack.co".to_string(),
            timeout_secs: 30,
        }
    }
}

impl PaystackConfig {
    pub fn from_env() -> PaymentResult<Self> {
        let secret_key = std::env::var("PAYSTACK_SECRET_KEY")
            .map_err(|_| PaymentError::ValidationError {
                message: "PAYSTACK_SECRET_KEY environment variable is required".to_string(),
                field: Some("PAYSTACK_SECRET_KEY".to_string()),
            })?;

        Ok(Self {
            webhook_secret: std::env::var("PAYSTACK_WEBHOOK_SECRET").ok(),
            base_url: std::env::var("PAYSTACK_BASE_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".to_string()),
            timeout_secs: std::env::var("PAYSTACK_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
            secret_key,
        })
    }
}

pub struct PaystackGateway {
    config: PaystackConfig,
    http: PaymentHttpClient,
}

impl PaystackGateway {
    pub fn new(config: PaystackConfig) -> PaymentResult<Self> {
        if config.secret_key.trim().is_empty() {
            return Err(PaymentError::validation(
                "paystack secret key must not be empty",
                "PAYSTACK_SECRET_KEY",
            ));
        }
        let http = PaymentHttpClient::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, http })
    }

    pub fn from_env() -> PaymentResult<Self> {
        Self::new(PaystackConfig::from_env()?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn provider_error(message: String) -> PaymentError {
        PaymentError::ProviderError {
            provider: "paystack".to_string(),
            message,
            provider_code: None,
        }
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize_transaction(
        &self,
        request: InitializeRequest,
    ) -> PaymentResult<InitializeResponse> {
        if request.amount_minor <= 0 {
            return Err(PaymentError::validation(
                "amount must be greater than zero",
                "amount",
            ));
        }
        if request.email.trim().is_empty() {
            return Err(PaymentError::validation(
                "customer email is required for paystack initialization",
                "email",
            ));
        }

        let payload = serde_json::json!({
            "email": request.email,
            "amount": request.amount_minor,
            "currency": request.currency,
            "reference": request.reference,
            "callback_url": request.callback_url,
            "metadata": { "order_id": request.order_id },
        });

        let raw: PaystackEnvelope<PaystackInitializeData> = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.endpoint("/transaction/initialize"),
                Some(&self.config.secret_key),
                Some(&payload),
            )
            .await?;

        let data = match (raw.status, raw.data) {
            (true, Some(data)) => data,
            _ => return Err(Self::provider_error(raw.message)),
        };
        if data.reference != request.reference {
            warn!(
                requested = %request.reference,
                returned = %data.reference,
                "paystack returned a different reference"
            );
        }
        info!(reference = %data.reference, "paystack transaction initialized");

        Ok(InitializeResponse {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify_transaction(&self, reference: &str) -> PaymentResult<VerifyResponse> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(PaymentError::validation("reference is required", "reference"));
        }

        let raw: PaystackEnvelope<PaystackVerifyData> = self
            .http
            .request_json(
                reqwest::Method::GET,
                &self.endpoint(&format!("/transaction/verify/{}", reference)),
                Some(&self.config.secret_key),
                None,
            )
            .await?;

        let data = match (raw.status, raw.data) {
            (true, Some(data)) => data,
            _ => return Err(Self::provider_error(raw.message)),
        };

        Ok(VerifyResponse {
            status: GatewayStatus::from_provider(&data.status),
            reference: data.reference.unwrap_or_else(|| reference.to_string()),
            amount_minor: data.amount,
            currency: data.currency,
            channel: data.channel,
            paid_at: parse_gateway_timestamp(data.paid_at.as_deref()),
            order_id: order_id_from_metadata(&data.metadata),
            gateway_response: data.gateway_response,
        })
    }

    fn name(&self) -> &'static str {
        "paystack"
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> PaymentResult<WebhookVerificationResult> {
        let signature = signature.trim();
        if signature.len() != 128 || hex::decode(signature).is_err() {
            return Err(PaymentError::WebhookVerificationError {
                message: "signature is not a SHA-512 hex digest".to_string(),
            });
        }

        let secret = self
            .config
            .webhook_secret
            .as_deref()
            .unwrap_or(&self.config.secret_key);
        let valid = verify_hmac_sha512_hex(payload, secret, signature);
        Ok(WebhookVerificationResult {
            valid,
            reason: if valid {
                None
            } else {
                Some("invalid paystack signature".to_string())
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct PaystackEnvelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PaystackInitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct PaystackVerifyData {
    amount: i64,
    currency: String,
    status: String,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    paid_at: Option<String>,
    #[serde(default)]
    gateway_response: Option<String>,
    #[serde(default)]
    metadata: JsonValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::utils::sign_hmac_sha512_hex;

    fn gateway() -> PaystackGateway {
        PaystackGateway::new(PaystackConfig {
            secret_key: "sk_test".to_string(),
            webhook_secret: None,
            base_url: "https://api.paystack.co/".to_string(),
            timeout_secs: 5,
        })
        .expect("gateway init should succeed")
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(
            gateway().endpoint("/transaction/initialize"),
            "https://api.paystack.co/transaction/initialize"
        );
    }

    #[test]
    fn empty_secret_key_is_rejected() {
        let result = PaystackGateway::new(PaystackConfig::default());
        assert!(matches!(result, Err(PaymentError::ValidationError { .. })));
    }

    #[test]
    fn webhook_signature_validation_invalid() {
        let payload = br#"{"event":"charge.success"}"#;
        let result = gateway()
            .verify_webhook(payload, &"ab".repeat(64))
            .expect("verification should not error");
        assert!(!result.valid);
        assert!(result.reason.is_some());
    }

    #[test]
    fn webhook_signature_that_is_not_a_digest_errors() {
        let payload = br#"{"event":"charge.success"}"#;
        let wrong_alphabet = "zz".repeat(64);
        for signature in ["invalid_signature", "abcd", wrong_alphabet.as_str()] {
            let result = gateway().verify_webhook(payload, signature);
            assert!(matches!(
                result,
                Err(PaymentError::WebhookVerificationError { .. })
            ));
        }
    }

    #[test]
    fn webhook_signature_uses_secret_key_by_default() {
        let payload = br#"{"event":"charge.success","data":{"reference":"r1"}}"#;
        let signature = sign_hmac_sha512_hex(payload, "sk_test").unwrap();
        let result = gateway()
            .verify_webhook(payload, &signature)
            .expect("verification should not error");
        assert!(result.valid);
    }

    #[test]
    fn envelope_without_data_deserializes() {
        let raw: PaystackEnvelope<PaystackVerifyData> =
            serde_json::from_str(r#"{"status":false,"message":"Transaction reference not found"}"#)
                .expect("envelope should parse");
        assert!(!raw.status);
        assert!(raw.data.is_none());
    }
}
