//! Client-facing payment endpoints
//!
//! POST /api/payments/initialize and POST /api/payments/verify. Both require
//! a bearer session; the resolved caller is handed to the settlement service
//! explicitly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedCaller;
use crate::middleware::error::{app_error_response, get_request_id_from_headers};
use crate::payments::types::GatewayStatus;
use crate::settlement::service::InitializePayment;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentRequest {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub amount: Option<BigDecimal>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl InitializePaymentRequest {
    fn into_command(self) -> AppResult<InitializePayment> {
        Ok(InitializePayment {
            order_id: self
                .order_id
                .ok_or_else(|| AppError::missing_field("orderId"))?,
            email: self.email.ok_or_else(|| AppError::missing_field("email"))?,
            amount: self.amount.ok_or_else(|| AppError::missing_field("amount"))?,
            callback_url: self.callback_url,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentResponse {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub status: GatewayStatus,
    /// Major units.
    pub amount: f64,
    pub channel: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub reference: String,
}

fn body_or_error<T>(
    payload: Result<Json<T>, JsonRejection>,
    request_id: &Option<String>,
) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| app_error_response(AppError::malformed_payload(e.body_text()), request_id.clone()))
}

/// POST /api/payments/initialize
pub async fn initialize_payment(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    headers: HeaderMap,
    payload: Result<Json<InitializePaymentRequest>, JsonRejection>,
) -> Result<Json<InitializePaymentResponse>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let command = body_or_error(payload, &request_id)?
        .into_command()
        .map_err(|e| app_error_response(e, request_id.clone()))?;

    let session = state
        .settlement
        .initialize(&caller, command)
        .await
        .map_err(|e| app_error_response(e, request_id.clone()))?;

    Ok(Json(InitializePaymentResponse {
        authorization_url: session.authorization_url,
        access_code: session.access_code,
        reference: session.reference,
    }))
}

/// POST /api/payments/verify
pub async fn verify_payment(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    headers: HeaderMap,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let reference = body_or_error(payload, &request_id)?
        .reference
        .ok_or_else(|| app_error_response(AppError::missing_field("reference"), request_id.clone()))?;

    let verified = state
        .settlement
        .verify(&caller, &reference)
        .await
        .map_err(|e| app_error_response(e, request_id.clone()))?;

    info!(
        reference = %verified.reference,
        status = %verified.status,
        caller = %caller,
        "Payment verified"
    );

    Ok(Json(VerifyPaymentResponse {
        success: verified.success,
        status: verified.status,
        amount: verified.amount.to_f64().unwrap_or_default(),
        channel: verified.channel,
        paid_at: verified.paid_at,
        reference: verified.reference,
    }))
}
