#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use eventhub_settlement::config::SettlementConfig;
use eventhub_settlement::database::error::{DatabaseError, DatabaseErrorKind};
use eventhub_settlement::database::memory::{InMemoryOrderStore, InMemoryTransactionLedger};
use eventhub_settlement::database::order_repository::{Order, OrderStatus};
use eventhub_settlement::database::repository::TransactionLedger;
use eventhub_settlement::database::transaction_repository::{
    LedgerUpdate, NewLedgerEntry, Transaction,
};
use eventhub_settlement::payments::error::{PaymentError, PaymentResult};
use eventhub_settlement::payments::provider::PaymentGateway;
use eventhub_settlement::payments::types::{
    GatewayStatus, InitializeRequest, InitializeResponse, VerifyResponse,
    WebhookVerificationResult,
};
use eventhub_settlement::payments::utils::{sign_hmac_sha512_hex, verify_hmac_sha512_hex};
use eventhub_settlement::settlement::SettlementService;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const WEBHOOK_SECRET: &str = "sk_test_webhook_secret";

/// What the fake gateway reports for `verify_transaction`.
#[derive(Debug, Clone)]
pub struct ScriptedCharge {
    pub status: GatewayStatus,
    pub amount_minor: i64,
    pub order_id: Option<String>,
    pub channel: Option<String>,
}

impl ScriptedCharge {
    pub fn success(order_id: &str, amount_minor: i64) -> Self {
        Self {
            status: GatewayStatus::Success,
            amount_minor,
            order_id: Some(order_id.to_string()),
            channel: Some("card".to_string()),
        }
    }
}

pub struct FakeGateway {
    charge: Mutex<ScriptedCharge>,
    fail_initialize: bool,
    pub initialize_calls: AtomicUsize,
    pub initialized: Mutex<Vec<InitializeRequest>>,
}

impl FakeGateway {
    pub fn new(charge: ScriptedCharge) -> Self {
        Self {
            charge: Mutex::new(charge),
            fail_initialize: false,
            initialize_calls: AtomicUsize::new(0),
            initialized: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_initialize(charge: ScriptedCharge) -> Self {
        Self {
            fail_initialize: true,
            ..Self::new(charge)
        }
    }

    pub fn set_charge(&self, charge: ScriptedCharge) {
        *self.charge.lock().unwrap() = charge;
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initialize_transaction(
        &self,
        request: InitializeRequest,
    ) -> PaymentResult<InitializeResponse> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize {
            return Err(PaymentError::ProviderError {
                provider: "paystack".to_string(),
                message: "Invalid key sk_live_do_not_leak".to_string(),
                provider_code: Some("401".to_string()),
            });
        }
        let response = InitializeResponse {
            authorization_url: format!("https://checkout.paystack.com/{}", request.reference),
            access_code: format!("ac_{}", request.reference),
            reference: request.reference.clone(),
        };
        self.initialized.lock().unwrap().push(request);
        Ok(response)
    }

    async fn verify_transaction(&self, reference: &str) -> PaymentResult<VerifyResponse> {
        let charge = self.charge.lock().unwrap().clone();
        Ok(VerifyResponse {
            status: charge.status,
            reference: reference.to_string(),
            amount_minor: charge.amount_minor,
            currency: "NGN".to_string(),
            channel: charge.channel,
            paid_at: None,
            order_id: charge.order_id,
            gateway_response: Some("Approved".to_string()),
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> PaymentResult<WebhookVerificationResult> {
        let valid = verify_hmac_sha512_hex(payload, WEBHOOK_SECRET, signature);
        Ok(WebhookVerificationResult {
            valid,
            reason: (!valid).then(|| "signature mismatch".to_string()),
        })
    }
}

/// Ledger whose writes always fail; reads report nothing.
pub struct UnavailableLedger;

fn unavailable() -> DatabaseError {
    DatabaseError::new(DatabaseErrorKind::Connection {
        message: "ledger offline".to_string(),
    })
}

#[async_trait]
impl TransactionLedger for UnavailableLedger {
    async fn create_pending(&self, _entry: NewLedgerEntry) -> Result<Transaction, DatabaseError> {
        Err(unavailable())
    }

    async fn find_by_reference(
        &self,
        _reference: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        Err(unavailable())
    }

    async fn update_by_reference(
        &self,
        _reference: &str,
        _update: &LedgerUpdate,
    ) -> Result<Option<Transaction>, DatabaseError> {
        Err(unavailable())
    }
}

pub fn order(id: &str, client_id: &str, total: i64) -> Order {
    Order {
        id: id.to_string(),
        client_id: client_id.to_string(),
        provider_id: Some("P1".to_string()),
        status: OrderStatus::Pending,
        total_amount: BigDecimal::from(total),
        deposit_paid: None,
    }
}

pub struct Harness {
    pub service: Arc<SettlementService>,
    pub gateway: Arc<FakeGateway>,
    pub orders: InMemoryOrderStore,
    pub ledger: InMemoryTransactionLedger,
}

pub async fn harness(gateway: FakeGateway) -> Harness {
    harness_with_config(gateway, SettlementConfig::default()).await
}

pub async fn harness_with_config(gateway: FakeGateway, config: SettlementConfig) -> Harness {
    let orders = InMemoryOrderStore::new();
    orders.insert(order("O1", "C1", 5000)).await;
    let ledger = InMemoryTransactionLedger::new();
    let gateway = Arc::new(gateway);

    let service = SettlementService::new(
        gateway.clone(),
        Arc::new(orders.clone()),
        Arc::new(ledger.clone()),
        config,
    );

    Harness {
        service: Arc::new(service),
        gateway,
        orders,
        ledger,
    }
}

pub fn charge_webhook(event: &str, reference: &str, amount_minor: i64, order_id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "event": event,
        "data": {
            "reference": reference,
            "amount": amount_minor,
            "channel": "card",
            "metadata": { "order_id": order_id },
            "paid_at": "2024-05-01T12:00:00.000Z",
            "status": if event == "charge.success" { "success" } else { "failed" },
        }
    }))
    .unwrap()
}

pub fn sign(body: &[u8]) -> String {
    sign_hmac_sha512_hex(body, WEBHOOK_SECRET).unwrap()
}
