use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::database::error::{DatabaseError, DatabaseErrorKind};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DatabaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "in_progress" => Ok(OrderStatus::InProgress),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DatabaseError::new(DatabaseErrorKind::Query {
                message: format!("unknown order status '{}'", other),
            })),
        }
    }
}

/// Marketplace order, as far as settlement is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub client_id: String,
    pub provider_id: Option<String>,
    pub status: OrderStatus,
    pub total_amount: BigDecimal,
    pub deposit_paid: Option<BigDecimal>,
}

impl Order {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.client_id == user_id
    }
}

/// Set-to-value order write, applied only while the order is in one of
/// `only_from`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdate {
    pub status: OrderStatus,
    pub deposit_paid: BigDecimal,
    pub only_from: Vec<OrderStatus>,
}

/// Primary key of an order in Postgres. An id that is not a UUID names no
/// order.
pub fn order_key(order_id: &str) -> Option<Uuid> {
    Uuid::parse_str(order_id.trim()).ok()
}

#[cfg(feature = "database")]
pub use self::postgres::PgOrderRepository;

#[cfg(feature = "database")]
mod postgres {
    use super::*;
    use crate::database::repository::OrderStore;
    use async_trait::async_trait;
    use sqlx::{FromRow, PgPool};

    #[derive(Debug, FromRow)]
    struct OrderRow {
        id: String,
        client_id: String,
        provider_id: Option<String>,
        status: String,
        total_amount: BigDecimal,
        deposit_paid: Option<BigDecimal>,
    }

    impl TryFrom<OrderRow> for Order {
        type Error = DatabaseError;

        fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
            Ok(Order {
                status: row.status.parse()?,
                id: row.id,
                client_id: row.client_id,
                provider_id: row.provider_id,
                total_amount: row.total_amount,
                deposit_paid: row.deposit_paid,
            })
        }
    }

    /// Orders table access
    #[derive(Clone)]
    pub struct PgOrderRepository {
        pool: PgPool,
    }

    impl PgOrderRepository {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }
    }

    #[async_trait]
    impl OrderStore for PgOrderRepository {
        async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>, DatabaseError> {
            let Some(key) = order_key(order_id) else {
                return Ok(None);
            };

            let row = sqlx::query_as::<_, OrderRow>(
                "SELECT id::text AS id, client_id::text AS client_id,
                        provider_id::text AS provider_id, status, total_amount, deposit_paid
                 FROM orders
                 WHERE id = $1",
            )
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

            row.map(Order::try_from).transpose()
        }

        async fn apply_update(
            &self,
            order_id: &str,
            update: &OrderUpdate,
        ) -> Result<Option<Order>, DatabaseError> {
            let Some(key) = order_key(order_id) else {
                return Ok(None);
            };
            let only_from: Vec<String> = update
                .only_from
                .iter()
                .map(|s| s.as_str().to_string())
                .collect();

            let row = sqlx::query_as::<_, OrderRow>(
                "UPDATE orders
                 SET status = $2, deposit_paid = $3, updated_at = NOW()
                 WHERE id = $1 AND status = ANY($4)
                 RETURNING id::text AS id, client_id::text AS client_id,
                           provider_id::text AS provider_id, status, total_amount, deposit_paid",
            )
            .bind(key)
            .bind(update.status.as_str())
            .bind(&update.deposit_paid)
            .bind(&only_from)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

            row.map(Order::try_from).transpose()
        }
    }
}
