//! Health check module
//! Reports service liveness and database reachability

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
#[cfg(feature = "database")]
use std::time::Instant;
use tokio::time::timeout;
use tracing::{error, info};

/// Health status response
#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: HealthState,
    pub service: &'static str,
    pub checks: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Overall health state
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health status
#[derive(Debug, Serialize, Clone)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub response_time_ms: Option<u128>,
    pub details: Option<String>,
}

/// Component state
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum ComponentState {
    Up,
    Down,
    Warning,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            status: HealthState::Healthy,
            service: env!("CARGO_PKG_NAME"),
            checks: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthState::Healthy)
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentHealth {
    pub fn up(response_time_ms: Option<u128>) -> Self {
        Self {
            status: ComponentState::Up,
            response_time_ms,
            details: None,
        }
    }

    pub fn down(details: Option<String>) -> Self {
        Self {
            status: ComponentState::Down,
            response_time_ms: None,
            details,
        }
    }

    pub fn warning(response_time_ms: Option<u128>, details: Option<String>) -> Self {
        Self {
            status: ComponentState::Warning,
            response_time_ms,
            details,
        }
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Health checker for the application
#[derive(Clone, Default)]
pub struct HealthChecker {
    #[cfg(feature = "database")]
    db_pool: Option<sqlx::PgPool>,
}

impl HealthChecker {
    #[cfg(feature = "database")]
    pub fn new(db_pool: Option<sqlx::PgPool>) -> Self {
        Self { db_pool }
    }

    /// Checker for runs backed by in-memory stores
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub async fn check_health(&self) -> HealthStatus {
        let mut health_status = HealthStatus::new();

        match timeout(Duration::from_secs(5), self.check_database()).await {
            Ok(Ok(Some(response_time))) => {
                health_status.checks.insert(
                    "database".to_string(),
                    ComponentHealth::up(Some(response_time)),
                );
                info!("Database health check: OK ({}ms)", response_time);
            }
            Ok(Ok(None)) => {
                health_status.status = HealthState::Degraded;
                health_status.checks.insert(
                    "database".to_string(),
                    ComponentHealth::warning(None, Some("in-memory stores".to_string())),
                );
            }
            Ok(Err(e)) => {
                health_status.status = HealthState::Unhealthy;
                health_status.checks.insert(
                    "database".to_string(),
                    ComponentHealth::down(Some(e.to_string())),
                );
                error!("Database health check failed: {}", e);
            }
            Err(_) => {
                health_status.status = HealthState::Unhealthy;
                health_status.checks.insert(
                    "database".to_string(),
                    ComponentHealth::down(Some("Timeout".to_string())),
                );
                error!("Database health check timed out");
            }
        }

        health_status
    }

    /// `Ok(None)` when there is no database to check.
    async fn check_database(&self) -> Result<Option<u128>, BoxError> {
        #[cfg(feature = "database")]
        if let Some(pool) = &self.db_pool {
            return check_database_health(pool).await.map(Some);
        }
        Ok(None)
    }
}

#[cfg(feature = "database")]
pub async fn check_database_health(pool: &sqlx::PgPool) -> Result<u128, BoxError> {
    let start = Instant::now();

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => Ok(start.elapsed().as_millis()),
        Err(e) => Err(Box::new(e)),
    }
}
