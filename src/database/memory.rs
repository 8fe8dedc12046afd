//! In-process stores with the same compare-and-set semantics as the
//! Postgres repositories. Used by the test suite and by local runs with
//! `SKIP_EXTERNALS=true`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::database::order_repository::{Order, OrderUpdate};
use crate::database::repository::{OrderStore, TransactionLedger};
use crate::database::transaction_repository::{
    LedgerUpdate, NewLedgerEntry, Transaction, TransactionStatus,
};

#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<String, Order>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id.clone(), order);
    }

    pub async fn get(&self, order_id: &str) -> Option<Order> {
        self.orders.read().await.get(order_id).cloned()
    }

    /// Number of updates that actually changed a row.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>, DatabaseError> {
        Ok(self.get(order_id).await)
    }

    async fn apply_update(
        &self,
        order_id: &str,
        update: &OrderUpdate,
    ) -> Result<Option<Order>, DatabaseError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(order_id) else {
            return Ok(None);
        };
        if !update.only_from.contains(&order.status) {
            return Ok(None);
        }
        order.status = update.status;
        order.deposit_paid = Some(update.deposit_paid.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Some(order.clone()))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTransactionLedger {
    rows: Arc<RwLock<HashMap<String, Transaction>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryTransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Transaction> {
        let mut rows: Vec<Transaction> = self.rows.read().await.values().cloned().collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        rows
    }

    pub async fn count_for_order(&self, order_id: &str) -> usize {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| row.order_id == order_id)
            .count()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionLedger for InMemoryTransactionLedger {
    async fn create_pending(&self, entry: NewLedgerEntry) -> Result<Transaction, DatabaseError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&entry.reference) {
            return Err(DatabaseError::duplicate("transactions", entry.reference));
        }
        let row = Transaction {
            id: Uuid::new_v4().to_string(),
            reference: entry.reference.clone(),
            order_id: entry.order_id,
            provider_id: entry.provider_id,
            amount: entry.amount,
            status: TransactionStatus::Pending,
            r#type: entry.r#type,
            payment_method: None,
            description: entry.description,
            processed_at: None,
            created_at: Utc::now(),
        };
        rows.insert(entry.reference, row.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(row)
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        Ok(self.rows.read().await.get(reference).cloned())
    }

    async fn update_by_reference(
        &self,
        reference: &str,
        update: &LedgerUpdate,
    ) -> Result<Option<Transaction>, DatabaseError> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.get_mut(reference) else {
            return Ok(None);
        };
        if !update.only_from.contains(&row.status) {
            return Ok(None);
        }
        row.status = update.status;
        if update.payment_method.is_some() {
            row.payment_method = update.payment_method.clone();
        }
        row.processed_at = Some(update.processed_at);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Some(row.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::order_repository::OrderStatus;
    use crate::database::transaction_repository::TransactionType;
    use bigdecimal::BigDecimal;

    fn entry(reference: &str) -> NewLedgerEntry {
        NewLedgerEntry {
            reference: reference.to_string(),
            order_id: "O1".to_string(),
            provider_id: Some("P1".to_string()),
            amount: BigDecimal::from(5000),
            r#type: TransactionType::Payment,
            description: "Payment for order O1".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_reference_is_rejected() {
        let ledger = InMemoryTransactionLedger::new();
        ledger.create_pending(entry("order_O1_1")).await.unwrap();
        let err = ledger.create_pending(entry("order_O1_1")).await.unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(ledger.count_for_order("O1").await, 1);
    }

    #[tokio::test]
    async fn update_respects_only_from_guard() {
        let ledger = InMemoryTransactionLedger::new();
        ledger.create_pending(entry("order_O1_1")).await.unwrap();

        let success = LedgerUpdate {
            status: TransactionStatus::Success,
            payment_method: Some("card".to_string()),
            processed_at: Utc::now(),
            only_from: vec![TransactionStatus::Pending, TransactionStatus::Failed],
        };
        let updated = ledger
            .update_by_reference("order_O1_1", &success)
            .await
            .unwrap()
            .expect("pending row should update");
        assert_eq!(updated.status, TransactionStatus::Success);

        let failed = LedgerUpdate {
            status: TransactionStatus::Failed,
            payment_method: None,
            processed_at: Utc::now(),
            only_from: vec![TransactionStatus::Pending],
        };
        assert!(ledger
            .update_by_reference("order_O1_1", &failed)
            .await
            .unwrap()
            .is_none());
        assert_eq!(ledger.write_count(), 2);
    }

    #[tokio::test]
    async fn order_update_skips_unlisted_status() {
        let store = InMemoryOrderStore::new();
        store
            .insert(Order {
                id: "O1".to_string(),
                client_id: "C1".to_string(),
                provider_id: None,
                status: OrderStatus::Completed,
                total_amount: BigDecimal::from(100),
                deposit_paid: None,
            })
            .await;

        let update = OrderUpdate {
            status: OrderStatus::Confirmed,
            deposit_paid: BigDecimal::from(100),
            only_from: vec![OrderStatus::Pending, OrderStatus::Confirmed],
        };
        assert!(store.apply_update("O1", &update).await.unwrap().is_none());
        assert_eq!(store.get("O1").await.unwrap().status, OrderStatus::Completed);
        assert!(store.apply_update("missing", &update).await.unwrap().is_none());
        assert_eq!(store.write_count(), 0);
    }
}
