pub mod payments;
pub mod webhooks;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

use crate::health::{HealthChecker, HealthState};
use crate::middleware::auth::SessionVerifier;
use crate::middleware::logging::{request_logging_middleware, UuidRequestId};
use crate::settlement::SettlementService;

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub settlement: Arc<SettlementService>,
    pub sessions: Arc<dyn SessionVerifier>,
    pub health: HealthChecker,
}

impl FromRef<AppState> for Arc<dyn SessionVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.health.check_health().await;
    let code = match status.status {
        HealthState::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthState::Healthy | HealthState::Degraded => StatusCode::OK,
    };
    (code, Json(status))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/payments/initialize", post(payments::initialize_payment))
        .route("/api/payments/verify", post(payments::verify_payment))
        .route("/webhooks/paystack", post(webhooks::paystack_webhook))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}
