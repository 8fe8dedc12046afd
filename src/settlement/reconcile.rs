//! Pure settlement merge
//!
//! Given what the store currently holds and what the gateway reports, decide
//! which write (if any) to issue. Every write is set-to-value and carries the
//! statuses the row may be in when it lands, so applying the same outcome any
//! number of times converges on the same state.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use crate::database::order_repository::{Order, OrderStatus, OrderUpdate};
use crate::database::transaction_repository::{LedgerUpdate, Transaction, TransactionStatus};
use crate::payments::types::GatewayStatus;

/// Orders that a successful charge may (re)confirm.
pub const CONFIRMABLE_ORDER_STATUSES: [OrderStatus; 2] =
    [OrderStatus::Pending, OrderStatus::Confirmed];

/// A gateway outcome for one reference, from either the webhook or verify.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementEvent {
    pub reference: String,
    pub status: GatewayStatus,
    pub order_id: Option<String>,
    /// Charged amount in major units.
    pub amount: BigDecimal,
    pub channel: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Merge<T> {
    Unchanged,
    Apply(T),
}

impl<T> Merge<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Merge::Unchanged)
    }
}

pub fn merge_order(order: &Order, event: &SettlementEvent) -> Merge<OrderUpdate> {
    if !event.status.is_success() {
        return Merge::Unchanged;
    }

    let already_recorded = order.deposit_paid.as_ref() == Some(&event.amount);
    match order.status {
        OrderStatus::Pending => {}
        OrderStatus::Confirmed if !already_recorded => {}
        _ => return Merge::Unchanged,
    }

    Merge::Apply(OrderUpdate {
        status: OrderStatus::Confirmed,
        deposit_paid: event.amount.clone(),
        only_from: CONFIRMABLE_ORDER_STATUSES.to_vec(),
    })
}

/// Ledger transitions: `pending -> success|failed`, `failed -> success`.
/// `success` is terminal.
pub fn merge_ledger(
    row: &Transaction,
    event: &SettlementEvent,
    now: DateTime<Utc>,
) -> Merge<LedgerUpdate> {
    if event.status.is_success() {
        if row.status == TransactionStatus::Success {
            return Merge::Unchanged;
        }
        return Merge::Apply(LedgerUpdate {
            status: TransactionStatus::Success,
            payment_method: event.channel.clone(),
            processed_at: event.paid_at.unwrap_or(now),
            only_from: vec![TransactionStatus::Pending, TransactionStatus::Failed],
        });
    }

    if event.status.is_failure() && row.status == TransactionStatus::Pending {
        return Merge::Apply(LedgerUpdate {
            status: TransactionStatus::Failed,
            payment_method: None,
            processed_at: now,
            only_from: vec![TransactionStatus::Pending],
        });
    }

    Merge::Unchanged
}
