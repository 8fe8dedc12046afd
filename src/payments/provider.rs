use crate::payments::error::PaymentResult;
use crate::payments::types::{
    InitializeRequest, InitializeResponse, VerifyResponse, WebhookVerificationResult,
};
use async_trait::async_trait;

/// Outbound seam to the hosted payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize_transaction(
        &self,
        request: InitializeRequest,
    ) -> PaymentResult<InitializeResponse>;

    /// Query-only; safe to repeat for the same reference.
    async fn verify_transaction(&self, reference: &str) -> PaymentResult<VerifyResponse>;

    fn name(&self) -> &'static str;

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> PaymentResult<WebhookVerificationResult>;
}
