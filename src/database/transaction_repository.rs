use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::database::error::{DatabaseError, DatabaseErrorKind};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = DatabaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(DatabaseError::new(DatabaseErrorKind::Query {
                message: format!("unknown transaction status '{}'", other),
            })),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Payment,
    Commission,
    Withdrawal,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Payment => "payment",
            TransactionType::Commission => "commission",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Refund => "refund",
        }
    }
}

impl FromStr for TransactionType {
    type Err = DatabaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "payment" => Ok(TransactionType::Payment),
            "commission" => Ok(TransactionType::Commission),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            "refund" => Ok(TransactionType::Refund),
            other => Err(DatabaseError::new(DatabaseErrorKind::Query {
                message: format!("unknown transaction type '{}'", other),
            })),
        }
    }
}

/// One ledger row per payment attempt, keyed by the gateway reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub reference: String,
    pub order_id: String,
    pub provider_id: Option<String>,
    /// Major units.
    pub amount: BigDecimal,
    pub status: TransactionStatus,
    #[serde(rename = "type")]
    pub r#type: TransactionType,
    pub payment_method: Option<String>,
    pub description: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub reference: String,
    pub order_id: String,
    pub provider_id: Option<String>,
    pub amount: BigDecimal,
    pub r#type: TransactionType,
    pub description: String,
}

/// Set-to-value ledger write, applied only while the row is in one of
/// `only_from`.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerUpdate {
    pub status: TransactionStatus,
    pub payment_method: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub only_from: Vec<TransactionStatus>,
}

#[cfg(feature = "database")]
pub use self::postgres::PgTransactionLedger;

#[cfg(feature = "database")]
mod postgres {
    use super::*;
    use crate::database::repository::TransactionLedger;
    use async_trait::async_trait;
    use sqlx::{FromRow, PgPool};

    const RETURNING_COLUMNS: &str = "id::text AS id, reference, order_id::text AS order_id,
        provider_id::text AS provider_id, amount, status, type, payment_method, description,
        processed_at, created_at";

    #[derive(Debug, FromRow)]
    struct TransactionRow {
        id: String,
        reference: String,
        order_id: String,
        provider_id: Option<String>,
        amount: BigDecimal,
        status: String,
        r#type: String,
        payment_method: Option<String>,
        description: Option<String>,
        processed_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    }

    impl TryFrom<TransactionRow> for Transaction {
        type Error = DatabaseError;

        fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
            Ok(Transaction {
                status: row.status.parse()?,
                r#type: row.r#type.parse()?,
                id: row.id,
                reference: row.reference,
                order_id: row.order_id,
                provider_id: row.provider_id,
                amount: row.amount,
                payment_method: row.payment_method,
                description: row.description.unwrap_or_default(),
                processed_at: row.processed_at,
                created_at: row.created_at,
            })
        }
    }

    /// Repository for the `transactions` ledger
    #[derive(Clone)]
    pub struct PgTransactionLedger {
        pool: PgPool,
    }

    impl PgTransactionLedger {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }
    }

    #[async_trait]
    impl TransactionLedger for PgTransactionLedger {
        async fn create_pending(
            &self,
            entry: NewLedgerEntry,
        ) -> Result<Transaction, DatabaseError> {
            let sql = format!(
                "INSERT INTO transactions
                 (reference, order_id, provider_id, amount, status, type, description)
                 VALUES ($1, $2::uuid, $3::uuid, $4, 'pending', $5, $6)
                 RETURNING {}",
                RETURNING_COLUMNS
            );

            let row = sqlx::query_as::<_, TransactionRow>(&sql)
                .bind(&entry.reference)
                .bind(&entry.order_id)
                .bind(&entry.provider_id)
                .bind(&entry.amount)
                .bind(entry.r#type.as_str())
                .bind(&entry.description)
                .fetch_one(&self.pool)
                .await
                .map_err(DatabaseError::from_sqlx)?;

            Transaction::try_from(row)
        }

        async fn find_by_reference(
            &self,
            reference: &str,
        ) -> Result<Option<Transaction>, DatabaseError> {
            let sql = format!(
                "SELECT {} FROM transactions WHERE reference = $1",
                RETURNING_COLUMNS
            );

            let row = sqlx::query_as::<_, TransactionRow>(&sql)
                .bind(reference)
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::from_sqlx)?;

            row.map(Transaction::try_from).transpose()
        }

        async fn update_by_reference(
            &self,
            reference: &str,
            update: &LedgerUpdate,
        ) -> Result<Option<Transaction>, DatabaseError> {
            let only_from: Vec<String> = update
                .only_from
                .iter()
                .map(|s| s.as_str().to_string())
                .collect();
            let sql = format!(
                "UPDATE transactions
                 SET status = $2,
                     payment_method = COALESCE($3, payment_method),
                     processed_at = $4
                 WHERE reference = $1 AND status = ANY($5)
                 RETURNING {}",
                RETURNING_COLUMNS
            );

            let row = sqlx::query_as::<_, TransactionRow>(&sql)
                .bind(reference)
                .bind(update.status.as_str())
                .bind(&update.payment_method)
                .bind(update.processed_at)
                .bind(&only_from)
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::from_sqlx)?;

            row.map(Transaction::try_from).transpose()
        }
    }
}
