//! Payment settlement: reference minting, webhook parsing, the pure merge,
//! and the service that applies it.

pub mod reconcile;
pub mod reference;
pub mod service;
pub mod webhook;

pub use reconcile::{merge_ledger, merge_order, Merge, SettlementEvent};
pub use service::{
    InitializePayment, PaymentSession, ReconcileReport, SettlementService, StepOutcome,
    VerifiedPayment, WebhookAck,
};
