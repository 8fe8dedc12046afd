use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde_json::{json, Value as JsonValue};
use tracing::info;

use crate::api::AppState;
use crate::error::AppError;
use crate::middleware::error::{app_error_response, get_request_id_from_headers};
use crate::payments::PAYSTACK_SIGNATURE_HEADER;

/// POST /webhooks/paystack
///
/// The signature is checked against the exact bytes received, so the body is
/// taken raw and only parsed after it has been authenticated.
pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<JsonValue>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let signature = headers
        .get(PAYSTACK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    info!(bytes = body.len(), signed = signature.is_some(), "Received paystack webhook");

    let ack = state
        .settlement
        .handle_webhook(&body, signature)
        .await
        .map_err(|e| app_error_response(e, request_id))?;

    match &ack.report {
        Some(report) => info!(
            event = %ack.event,
            reference = %report.reference,
            order = ?report.order,
            ledger = ?report.ledger,
            "Webhook processed"
        ),
        None => info!(event = %ack.event, "Webhook acknowledged"),
    }

    Ok(Json(json!({ "received": true })))
}
