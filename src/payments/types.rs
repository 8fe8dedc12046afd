use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Charge status as reported by the gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStatus {
    Success,
    Failed,
    Reversed,
    Abandoned,
    Pending,
    Unknown,
}

impl GatewayStatus {
    pub fn from_provider(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "success" | "successful" => GatewayStatus::Success,
            "failed" => GatewayStatus::Failed,
            "reversed" => GatewayStatus::Reversed,
            "abandoned" => GatewayStatus::Abandoned,
            "pending" | "ongoing" | "processing" | "queued" => GatewayStatus::Pending,
            _ => GatewayStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayStatus::Success => "success",
            GatewayStatus::Failed => "failed",
            GatewayStatus::Reversed => "reversed",
            GatewayStatus::Abandoned => "abandoned",
            GatewayStatus::Pending => "pending",
            GatewayStatus::Unknown => "unknown",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GatewayStatus::Success)
    }

    /// Terminal failure. Abandoned checkouts can still be completed later,
    /// so they are not treated as failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, GatewayStatus::Failed | GatewayStatus::Reversed)
    }
}

impl std::fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub email: String,
    pub amount_minor: i64,
    pub currency: String,
    pub reference: String,
    pub callback_url: Option<String>,
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub status: GatewayStatus,
    pub reference: String,
    pub amount_minor: i64,
    pub currency: String,
    pub channel: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub order_id: Option<String>,
    pub gateway_response: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookVerificationResult {
    pub valid: bool,
    pub reason: Option<String>,
}

/// Reads `order_id` out of gateway metadata. Gateways echo metadata back as
/// an object, and sometimes as a JSON-encoded string or an empty string.
pub fn order_id_from_metadata(metadata: &JsonValue) -> Option<String> {
    let object = match metadata {
        JsonValue::String(raw) if !raw.trim().is_empty() => {
            serde_json::from_str::<JsonValue>(raw).ok()?
        }
        other => other.clone(),
    };

    match object.get("order_id")? {
        JsonValue::String(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
        JsonValue::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

pub fn parse_gateway_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_statuses_map_to_gateway_status() {
        assert_eq!(GatewayStatus::from_provider("success"), GatewayStatus::Success);
        assert_eq!(GatewayStatus::from_provider("FAILED"), GatewayStatus::Failed);
        assert_eq!(GatewayStatus::from_provider("abandoned"), GatewayStatus::Abandoned);
        assert_eq!(GatewayStatus::from_provider("ongoing"), GatewayStatus::Pending);
        assert_eq!(GatewayStatus::from_provider("weird"), GatewayStatus::Unknown);
        assert!(!GatewayStatus::Abandoned.is_failure());
        assert!(GatewayStatus::Reversed.is_failure());
    }

    #[test]
    fn order_id_is_read_from_object_and_string_metadata() {
        assert_eq!(
            order_id_from_metadata(&json!({"order_id": "O1"})).as_deref(),
            Some("O1")
        );
        assert_eq!(
            order_id_from_metadata(&json!({"order_id": 42})).as_deref(),
            Some("42")
        );
        assert_eq!(
            order_id_from_metadata(&json!("{\"order_id\":\"O2\"}")).as_deref(),
            Some("O2")
        );
        assert_eq!(order_id_from_metadata(&json!("")), None);
        assert_eq!(order_id_from_metadata(&JsonValue::Null), None);
        assert_eq!(order_id_from_metadata(&json!({"order_id": ""})), None);
    }

    #[test]
    fn gateway_timestamps_parse_rfc3339() {
        let parsed = parse_gateway_timestamp(Some("2024-03-10T12:30:00.000Z"))
            .expect("timestamp should parse");
        assert_eq!(parsed.to_rfc3339(), "2024-03-10T12:30:00+00:00");
        assert!(parse_gateway_timestamp(Some("yesterday")).is_none());
        assert!(parse_gateway_timestamp(None).is_none());
    }
}
