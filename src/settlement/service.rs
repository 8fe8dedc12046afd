//! Settlement Service
//!
//! Drives the payment lifecycle for marketplace orders: starts a gateway
//! checkout, and folds gateway outcomes (from the webhook or from the
//! client-driven verify) into the order and the transaction ledger.
//!
//! Both settlement paths end in [`SettlementService::reconcile`], which reads
//! current state, asks the pure merge what to write, and applies the order
//! write before the ledger write. Order failures fail the call; ledger
//! failures are logged and swallowed.

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::SettlementConfig;
use crate::database::order_repository::Order;
use crate::database::repository::{OrderStore, TransactionLedger};
use crate::database::transaction_repository::{NewLedgerEntry, TransactionType};
use crate::error::{AppError, AppResult, AuthError, GatewayOperation};
use crate::middleware::auth::CallerId;
use crate::payments::provider::PaymentGateway;
use crate::payments::types::{GatewayStatus, InitializeRequest};
use crate::payments::utils::{round_major_units, to_major_units, to_minor_units};
use crate::settlement::reconcile::{
    merge_ledger, merge_order, Merge, SettlementEvent, CONFIRMABLE_ORDER_STATUSES,
};
use crate::settlement::reference::ReferenceGenerator;
use crate::settlement::webhook::PaystackWebhook;

// ============================================================================
// Inputs & Outputs
// ============================================================================

#[derive(Debug, Clone)]
pub struct InitializePayment {
    pub order_id: String,
    pub email: String,
    /// Major units, as entered by the payer.
    pub amount: BigDecimal,
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSession {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedPayment {
    pub success: bool,
    pub status: GatewayStatus,
    /// Major units.
    pub amount: BigDecimal,
    pub channel: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub reference: String,
    pub order_id: Option<String>,
}

/// What happened to one side of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Applied,
    /// Already in the reported state, or the reported status settles nothing.
    Unchanged,
    /// The row is in a state this outcome may not move it out of.
    Skipped,
    /// No order id, or no row for it.
    Missing,
    /// Write failed and was swallowed (ledger only).
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub reference: String,
    pub status: GatewayStatus,
    pub order: StepOutcome,
    pub ledger: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookAck {
    pub event: String,
    /// `None` for events that do not settle a charge.
    pub report: Option<ReconcileReport>,
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct SettlementService {
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderStore>,
    ledger: Arc<dyn TransactionLedger>,
    references: Arc<ReferenceGenerator>,
    config: SettlementConfig,
}

impl SettlementService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderStore>,
        ledger: Arc<dyn TransactionLedger>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            gateway,
            orders,
            ledger,
            references: Arc::new(ReferenceGenerator::new()),
            config,
        }
    }

    /// Start a gateway checkout for an order the caller owns. The ledger row
    /// is written only after the gateway accepted the reference.
    pub async fn initialize(
        &self,
        caller: &CallerId,
        request: InitializePayment,
    ) -> AppResult<PaymentSession> {
        let order_id = request.order_id.trim();
        if order_id.is_empty() {
            return Err(AppError::missing_field("orderId"));
        }
        let email = request.email.trim();
        if email.is_empty() {
            return Err(AppError::missing_field("email"));
        }
        if !email.contains('@') {
            return Err(AppError::invalid_field("email", "must be an email address"));
        }
        let amount = round_major_units(&request.amount);
        if amount <= BigDecimal::zero() {
            return Err(AppError::invalid_amount(
                &request.amount,
                "Amount must be greater than zero",
            ));
        }

        let order = self.owned_order(caller, order_id).await?;
        if amount > order.total_amount {
            return Err(AppError::invalid_amount(
                &amount,
                format!("Amount exceeds order total of {}", order.total_amount),
            ));
        }

        let amount_minor = to_minor_units(&amount)
            .map_err(|e| AppError::from_gateway(GatewayOperation::Initialize, e))?;
        let reference = self.references.next(&order.id);

        let session = self
            .gateway
            .initialize_transaction(InitializeRequest {
                email: email.to_string(),
                amount_minor,
                currency: self.config.currency.clone(),
                reference: reference.clone(),
                callback_url: request.callback_url.filter(|url| !url.trim().is_empty()),
                order_id: order.id.clone(),
            })
            .await
            .map_err(|e| {
                error!(
                    order_id = %order.id,
                    reference = %reference,
                    gateway = self.gateway.name(),
                    error = %e,
                    "Gateway rejected payment initialization"
                );
                AppError::from_gateway(GatewayOperation::Initialize, e)
            })?;

        self.ledger
            .create_pending(NewLedgerEntry {
                reference: session.reference.clone(),
                order_id: order.id.clone(),
                provider_id: order.provider_id.clone(),
                amount: amount.clone(),
                r#type: TransactionType::Payment,
                description: format!("Payment for order {}", order.id),
            })
            .await
            .map_err(|e| {
                error!(
                    order_id = %order.id,
                    reference = %session.reference,
                    error = %e,
                    "Failed to record pending transaction"
                );
                AppError::from(e)
            })?;

        info!(
            order_id = %order.id,
            reference = %session.reference,
            amount = %amount,
            caller = %caller,
            "Payment initialized"
        );

        Ok(PaymentSession {
            authorization_url: session.authorization_url,
            access_code: session.access_code,
            reference: session.reference,
        })
    }

    /// Re-confirm a charge with the gateway and settle it on the caller's
    /// behalf. Ownership is checked before anything is written.
    pub async fn verify(&self, caller: &CallerId, reference: &str) -> AppResult<VerifiedPayment> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AppError::missing_field("reference"));
        }

        let verified = self
            .gateway
            .verify_transaction(reference)
            .await
            .map_err(|e| {
                warn!(reference = %reference, error = %e, "Gateway verification failed");
                AppError::from_gateway(GatewayOperation::Verify, e)
            })?;

        let order_id = match verified.order_id.clone() {
            Some(id) => Some(id),
            None => self
                .ledger
                .find_by_reference(reference)
                .await?
                .map(|row| row.order_id),
        };

        let Some(order_id) = order_id else {
            warn!(reference = %reference, "Reference unknown to gateway metadata and ledger");
            return Err(AppError::transaction_not_found(reference));
        };
        self.owned_order(caller, &order_id).await?;

        let event = SettlementEvent {
            reference: reference.to_string(),
            status: verified.status,
            order_id: Some(order_id.clone()),
            amount: to_major_units(verified.amount_minor),
            channel: verified.channel.clone(),
            paid_at: verified.paid_at,
        };
        self.reconcile(&event).await?;

        Ok(VerifiedPayment {
            success: verified.status.is_success(),
            status: verified.status,
            amount: event.amount,
            channel: verified.channel,
            paid_at: verified.paid_at,
            reference: verified.reference,
            order_id: Some(order_id),
        })
    }

    /// Authenticate a raw webhook delivery and settle the charge it reports.
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> AppResult<WebhookAck> {
        match signature.map(str::trim).filter(|s| !s.is_empty()) {
            Some(signature) => {
                let verdict = self.gateway.verify_webhook(body, signature).map_err(|e| {
                    warn!(error = %e, "Webhook signature check errored");
                    AppError::auth(AuthError::InvalidWebhookSignature)
                })?;
                if !verdict.valid {
                    warn!(
                        reason = verdict.reason.as_deref().unwrap_or("mismatch"),
                        "Rejected webhook with invalid signature"
                    );
                    return Err(AppError::auth(AuthError::InvalidWebhookSignature));
                }
            }
            None if self.config.allow_unsigned_webhooks => {
                warn!("Accepting unsigned webhook (sandbox mode)");
            }
            None => {
                warn!("Rejected webhook without signature");
                return Err(AppError::auth(AuthError::MissingWebhookSignature));
            }
        }

        let webhook = PaystackWebhook::from_slice(body)
            .map_err(|e| AppError::malformed_payload(e.to_string()))?;

        let settles = webhook.settlement_event().map_err(|e| {
            warn!(event = %webhook.event, error = %e, "Rejected unsettleable webhook");
            AppError::malformed_payload(e.to_string())
        })?;
        let Some(event) = settles else {
            info!(event = %webhook.event, "Ignoring webhook event");
            return Ok(WebhookAck {
                event: webhook.event,
                report: None,
            });
        };

        let report = self.reconcile(&event).await?;
        Ok(WebhookAck {
            event: webhook.event,
            report: Some(report),
        })
    }

    /// Fold one gateway outcome into the order and the ledger. Safe to call
    /// any number of times, from any number of tasks, for the same event.
    pub async fn reconcile(&self, event: &SettlementEvent) -> AppResult<ReconcileReport> {
        let order = self.settle_order(event).await?;
        let ledger = self.settle_ledger(event).await;

        info!(
            reference = %event.reference,
            status = %event.status,
            order = ?order,
            ledger = ?ledger,
            "Settlement reconciled"
        );

        Ok(ReconcileReport {
            reference: event.reference.clone(),
            status: event.status,
            order,
            ledger,
        })
    }

    async fn settle_order(&self, event: &SettlementEvent) -> AppResult<StepOutcome> {
        if !event.status.is_success() {
            return Ok(StepOutcome::Unchanged);
        }
        let Some(order_id) = event.order_id.as_deref() else {
            warn!(reference = %event.reference, "Successful charge carries no order id");
            return Ok(StepOutcome::Missing);
        };
        let Some(order) = self.orders.find_by_id(order_id).await? else {
            warn!(order_id = %order_id, reference = %event.reference, "Order not found for charge");
            return Ok(StepOutcome::Missing);
        };

        let update = match merge_order(&order, event) {
            Merge::Apply(update) => update,
            Merge::Unchanged => {
                if !CONFIRMABLE_ORDER_STATUSES.contains(&order.status) {
                    warn!(
                        order_id = %order_id,
                        status = %order.status,
                        "Order already past confirmation; not regressing"
                    );
                    return Ok(StepOutcome::Skipped);
                }
                return Ok(StepOutcome::Unchanged);
            }
        };

        match self.orders.apply_update(order_id, &update).await? {
            Some(updated) => {
                info!(
                    order_id = %order_id,
                    status = %updated.status,
                    deposit_paid = %update.deposit_paid,
                    "Order confirmed"
                );
                Ok(StepOutcome::Applied)
            }
            None => {
                warn!(order_id = %order_id, "Order moved on before confirmation landed");
                Ok(StepOutcome::Skipped)
            }
        }
    }

    async fn settle_ledger(&self, event: &SettlementEvent) -> StepOutcome {
        let row = match self.ledger.find_by_reference(&event.reference).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                warn!(reference = %event.reference, "No ledger row for reference");
                return StepOutcome::Missing;
            }
            Err(e) => {
                error!(reference = %event.reference, error = %e, "Ledger lookup failed");
                return StepOutcome::Failed;
            }
        };

        let update = match merge_ledger(&row, event, Utc::now()) {
            Merge::Apply(update) => update,
            Merge::Unchanged => return StepOutcome::Unchanged,
        };

        match self.ledger.update_by_reference(&event.reference, &update).await {
            Ok(Some(updated)) => {
                info!(
                    reference = %event.reference,
                    status = %updated.status,
                    "Ledger row settled"
                );
                StepOutcome::Applied
            }
            Ok(None) => StepOutcome::Skipped,
            Err(e) => {
                error!(reference = %event.reference, error = %e, "Ledger update failed");
                StepOutcome::Failed
            }
        }
    }

    async fn owned_order(&self, caller: &CallerId, order_id: &str) -> AppResult<Order> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        if !order.is_owned_by(caller.as_str()) {
            warn!(order_id = %order_id, caller = %caller, "Caller does not own order");
            return Err(AppError::not_owner(order_id));
        }
        Ok(order)
    }
}
