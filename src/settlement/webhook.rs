//! Paystack webhook payloads

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::payments::types::{order_id_from_metadata, parse_gateway_timestamp, GatewayStatus};
use crate::payments::utils::to_major_units;
use crate::settlement::reconcile::SettlementEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    ChargeSuccess,
    ChargeFailed,
    Other(String),
}

impl WebhookEventKind {
    pub fn parse(event: &str) -> Self {
        match event {
            "charge.success" => WebhookEventKind::ChargeSuccess,
            "charge.failed" => WebhookEventKind::ChargeFailed,
            other => WebhookEventKind::Other(other.to_string()),
        }
    }
}

/// A well-formed webhook whose content cannot settle anything.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookPayloadError {
    #[error("charge.success for {reference} carries no positive amount")]
    MissingAmount { reference: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaystackWebhook {
    pub event: String,
    pub data: WebhookCharge,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookCharge {
    pub reference: String,
    /// Minor units. Absent on some non-charge events.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub metadata: JsonValue,
    #[serde(default, alias = "paidAt")]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl PaystackWebhook {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn kind(&self) -> WebhookEventKind {
        WebhookEventKind::parse(&self.event)
    }

    /// The settlement this webhook reports, or `None` for events that do not
    /// settle a charge. A successful charge must carry a positive amount.
    pub fn settlement_event(&self) -> Result<Option<SettlementEvent>, WebhookPayloadError> {
        let (status, amount_minor) = match self.kind() {
            WebhookEventKind::ChargeSuccess => match self.data.amount {
                Some(amount) if amount > 0 => (GatewayStatus::Success, amount),
                _ => {
                    return Err(WebhookPayloadError::MissingAmount {
                        reference: self.data.reference.clone(),
                    })
                }
            },
            WebhookEventKind::ChargeFailed => {
                (GatewayStatus::Failed, self.data.amount.unwrap_or_default())
            }
            WebhookEventKind::Other(_) => return Ok(None),
        };

        Ok(Some(SettlementEvent {
            reference: self.data.reference.clone(),
            status,
            order_id: order_id_from_metadata(&self.data.metadata),
            amount: to_major_units(amount_minor),
            channel: self.data.channel.clone(),
            paid_at: parse_gateway_timestamp(self.data.paid_at.as_deref()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    #[test]
    fn charge_success_becomes_settlement_event() {
        let body = br#"{
            "event": "charge.success",
            "data": {
                "reference": "order_O1_1700000000000",
                "amount": 500000,
                "channel": "card",
                "metadata": {"order_id": "O1"},
                "paid_at": "2024-01-01T10:00:00.000Z",
                "status": "success"
            }
        }"#;

        let webhook = PaystackWebhook::from_slice(body).unwrap();
        let event = webhook.settlement_event().unwrap().expect("settles");
        assert_eq!(event.status, GatewayStatus::Success);
        assert_eq!(event.order_id.as_deref(), Some("O1"));
        assert_eq!(event.amount, BigDecimal::from_str("5000.00").unwrap());
        assert_eq!(event.channel.as_deref(), Some("card"));
        assert!(event.paid_at.is_some());
    }

    #[test]
    fn charge_failed_maps_to_failed() {
        let body = br#"{"event":"charge.failed","data":{"reference":"r1","amount":100}}"#;
        let event = PaystackWebhook::from_slice(body)
            .unwrap()
            .settlement_event()
            .unwrap()
            .unwrap();
        assert_eq!(event.status, GatewayStatus::Failed);
        assert!(event.order_id.is_none());
    }

    #[test]
    fn unrelated_events_do_not_settle() {
        let body = br#"{"event":"transfer.success","data":{"reference":"t1"}}"#;
        let webhook = PaystackWebhook::from_slice(body).unwrap();
        assert_eq!(webhook.kind(), WebhookEventKind::Other("transfer.success".to_string()));
        assert_eq!(webhook.settlement_event(), Ok(None));
    }

    #[test]
    fn charge_success_without_amount_is_rejected() {
        for body in [
            &br#"{"event":"charge.success","data":{"reference":"r1","metadata":{"order_id":"O1"}}}"#[..],
            &br#"{"event":"charge.success","data":{"reference":"r1","amount":0}}"#[..],
        ] {
            let webhook = PaystackWebhook::from_slice(body).unwrap();
            assert_eq!(
                webhook.settlement_event(),
                Err(WebhookPayloadError::MissingAmount {
                    reference: "r1".to_string()
                })
            );
        }
    }

    #[test]
    fn missing_reference_is_malformed() {
        assert!(PaystackWebhook::from_slice(br#"{"event":"charge.success","data":{}}"#).is_err());
        assert!(PaystackWebhook::from_slice(b"not json").is_err());
    }
}
