//! Store seams used by the settlement core.
//!
//! Both traits are plain data access. Every update is a single-row
//! compare-and-set keyed by primary or unique key: the caller names the
//! statuses the row may currently be in, and a row in any other status is
//! left alone and reported as `None`.

use async_trait::async_trait;

use crate::database::error::DatabaseError;
use crate::database::order_repository::{Order, OrderUpdate};
use crate::database::transaction_repository::{LedgerUpdate, NewLedgerEntry, Transaction};

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>, DatabaseError>;

    async fn apply_update(
        &self,
        order_id: &str,
        update: &OrderUpdate,
    ) -> Result<Option<Order>, DatabaseError>;
}

#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Inserts a `pending` row. A reference that already exists is rejected
    /// with a duplicate error, never overwritten.
    async fn create_pending(&self, entry: NewLedgerEntry) -> Result<Transaction, DatabaseError>;

    async fn find_by_reference(&self, reference: &str)
        -> Result<Option<Transaction>, DatabaseError>;

    async fn update_by_reference(
        &self,
        reference: &str,
        update: &LedgerUpdate,
    ) -> Result<Option<Transaction>, DatabaseError>;
}
