//! Paystack client against a mocked HTTP server

use eventhub_settlement::payments::error::PaymentError;
use eventhub_settlement::payments::provider::PaymentGateway;
use eventhub_settlement::payments::types::{GatewayStatus, InitializeRequest};
use eventhub_settlement::payments::{PaystackConfig, PaystackGateway};
use mockito::Matcher;
use serde_json::json;

fn gateway(base_url: String) -> PaystackGateway {
    PaystackGateway::new(PaystackConfig {
        secret_key: "sk_test_123".to_string(),
        webhook_secret: None,
        base_url,
        timeout_secs: 5,
    })
    .unwrap()
}

fn initialize_request() -> InitializeRequest {
    InitializeRequest {
        email: "client@example.com".to_string(),
        amount_minor: 500_000,
        currency: "NGN".to_string(),
        reference: "order_O1_1714560000000".to_string(),
        callback_url: Some("https://app.example.com/payment/callback".to_string()),
        order_id: "O1".to_string(),
    }
}

#[tokio::test]
async fn initialize_sends_minor_units_and_order_metadata() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/transaction/initialize")
        .match_header("authorization", "Bearer sk_test_123")
        .match_body(Matcher::PartialJson(json!({
            "email": "client@example.com",
            "amount": 500000,
            "currency": "NGN",
            "reference": "order_O1_1714560000000",
            "callback_url": "https://app.example.com/payment/callback",
            "metadata": { "order_id": "O1" }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "status": true,
                "message": "Authorization URL created",
                "data": {
                    "authorization_url": "https://checkout.paystack.com/abc123",
                    "access_code": "abc123",
                    "reference": "order_O1_1714560000000"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let session = gateway(server.url())
        .initialize_transaction(initialize_request())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(session.authorization_url, "https://checkout.paystack.com/abc123");
    assert_eq!(session.access_code, "abc123");
    assert_eq!(session.reference, "order_O1_1714560000000");
}

#[tokio::test]
async fn initialize_rejection_is_a_provider_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/transaction/initialize")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": false, "message": "Duplicate Transaction Reference"}"#)
        .create_async()
        .await;

    let err = gateway(server.url())
        .initialize_transaction(initialize_request())
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::ProviderError { .. }));
}

#[tokio::test]
async fn initialize_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/transaction/initialize")
        .with_status(503)
        .with_body("upstream unavailable")
        .expect(1)
        .create_async()
        .await;

    let err = gateway(server.url())
        .initialize_transaction(initialize_request())
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, PaymentError::ProviderError { .. }));
}

#[tokio::test]
async fn rate_limit_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/transaction/verify/r1")
        .with_status(429)
        .create_async()
        .await;

    let err = gateway(server.url()).verify_transaction("r1").await.unwrap_err();
    assert!(matches!(err, PaymentError::RateLimitError { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn verify_maps_status_amount_and_metadata() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/transaction/verify/order_O1_1714560000000")
        .match_header("authorization", "Bearer sk_test_123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "status": true,
                "message": "Verification successful",
                "data": {
                    "status": "success",
                    "amount": 500000,
                    "currency": "NGN",
                    "reference": "order_O1_1714560000000",
                    "paid_at": "2024-05-01T12:00:00.000Z",
                    "channel": "card",
                    "metadata": { "order_id": "O1" },
                    "gateway_response": "Successful"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let verified = gateway(server.url())
        .verify_transaction("order_O1_1714560000000")
        .await
        .unwrap();

    assert_eq!(verified.status, GatewayStatus::Success);
    assert_eq!(verified.amount_minor, 500_000);
    assert_eq!(verified.order_id.as_deref(), Some("O1"));
    assert_eq!(verified.channel.as_deref(), Some("card"));
    assert!(verified.paid_at.is_some());
}

#[tokio::test]
async fn verify_tolerates_empty_metadata() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/transaction/verify/r2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"status":true,"message":"ok","data":{"status":"abandoned","amount":100,"currency":"NGN","metadata":""}}"#,
        )
        .create_async()
        .await;

    let verified = gateway(server.url()).verify_transaction("r2").await.unwrap();
    assert_eq!(verified.status, GatewayStatus::Abandoned);
    assert!(verified.order_id.is_none());
    assert_eq!(verified.reference, "r2");
}

#[tokio::test]
async fn unreachable_gateway_is_a_network_error() {
    // Nothing listens on port 9 of localhost in the test environment.
    let err = gateway("http://127.0.0.1:9".to_string())
        .verify_transaction("r3")
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NetworkError { .. }));
}
