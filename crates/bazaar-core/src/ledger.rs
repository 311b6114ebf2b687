//! Ledger entities, transactions, and the running-total aggregator
//!
//! Entities carry cached running totals (`total_owed_to_me`,
//! `total_i_owe_them`) derived from their transactions. The invariant:
//! each total equals the sum of amounts of the entity's currently
//! `Pending` transactions in the matching direction. The cached fields
//! are a materialized view, never independently authoritative.
//!
//! The transaction write and the total adjustment are two separate
//! statements, but the adjustment itself is a single atomic in-place
//! increment at the storage layer, so concurrent transactions cannot
//! lose each other's updates.
//!
//! Amounts are integer minor currency units.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| Error::validation("entity_id", e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| Error::validation("transaction_id", e.to_string()))
    }
}

/// Direction of money flow from the merchant's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// They owe me; pending amounts accrue on `total_owed_to_me`.
    Income,
    /// I owe them; pending amounts accrue on `total_i_owe_them`.
    Expense,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Income => write!(f, "income"),
            Direction::Expense => write!(f, "expense"),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "income" => Ok(Direction::Income),
            "expense" => Ok(Direction::Expense),
            other => Err(Error::validation(
                "direction",
                format!("unknown direction '{}'", other),
            )),
        }
    }
}

/// Settlement status. Only `Pending` contributes to cached totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Paid,
    Cancelled,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Paid => write!(f, "paid"),
            TransactionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "paid" => Ok(TransactionStatus::Paid),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            other => Err(Error::validation(
                "status",
                format!("unknown transaction status '{}'", other),
            )),
        }
    }
}

/// A counterparty with cached pending totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntity {
    pub id: EntityId,
    pub name: String,
    /// Unique per deployment.
    pub phone: String,
    pub entity_type: String,
    /// Cached sum of pending income amounts, minor units.
    pub total_owed_to_me: i64,
    /// Cached sum of pending expense amounts, minor units.
    pub total_i_owe_them: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: TransactionId,
    pub entity_id: EntityId,
    /// Minor currency units, always positive.
    pub amount: i64,
    pub direction: Direction,
    pub status: TransactionStatus,
    pub transaction_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEntity {
    pub name: String,
    pub phone: String,
    pub entity_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub entity_id: EntityId,
    pub amount: i64,
    pub direction: Direction,
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub transaction_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// True sums over the transaction set, for verifying the cached totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingSums {
    pub owed_to_me: i64,
    pub i_owe_them: i64,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// # Errors
    /// - `Error::Conflict` if the phone number is already registered
    async fn insert_entity(&self, entity: &LedgerEntity) -> Result<()>;

    async fn find_entity(&self, id: EntityId) -> Result<Option<LedgerEntity>>;

    /// Atomically add deltas to the cached totals, in place.
    ///
    /// Implementations must issue a single `UPDATE ... SET total = total + ?`
    /// style statement, never read-then-write.
    ///
    /// # Errors
    /// - `Error::NotFound` if the entity does not exist
    async fn adjust_totals(
        &self,
        entity_id: EntityId,
        owed_delta: i64,
        owe_delta: i64,
    ) -> Result<()>;

    async fn insert_transaction(&self, txn: &LedgerTransaction) -> Result<()>;

    async fn find_transaction(&self, id: TransactionId) -> Result<Option<LedgerTransaction>>;

    /// # Errors
    /// - `Error::NotFound` if the transaction does not exist
    async fn set_transaction_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<()>;

    /// Idempotent; reports whether a row was removed.
    async fn delete_transaction(&self, id: TransactionId) -> Result<bool>;

    async fn list_transactions(&self, entity_id: EntityId) -> Result<Vec<LedgerTransaction>>;

    /// Sum pending amounts per direction directly from the transaction
    /// set. Used to verify the cached totals, not in the hot path.
    async fn pending_sums(&self, entity_id: EntityId) -> Result<PendingSums>;
}

/// (owed_to_me delta, i_owe_them delta) for one transaction amount.
fn deltas(direction: Direction, amount: i64) -> (i64, i64) {
    match direction {
        Direction::Income => (amount, 0),
        Direction::Expense => (0, amount),
    }
}

/// Keeps entity totals in sync with transaction writes.
#[derive(Clone)]
pub struct LedgerAggregator {
    store: std::sync::Arc<dyn LedgerStore>,
}

impl LedgerAggregator {
    pub fn new(store: std::sync::Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn create_entity(&self, new: NewEntity) -> Result<LedgerEntity> {
        if new.name.trim().is_empty() {
            return Err(Error::validation("name", "must not be empty"));
        }
        if new.phone.trim().is_empty() {
            return Err(Error::validation("phone", "must not be empty"));
        }
        let entity = LedgerEntity {
            id: EntityId::new(),
            name: new.name.trim().to_string(),
            phone: new.phone.trim().to_string(),
            entity_type: new.entity_type,
            total_owed_to_me: 0,
            total_i_owe_them: 0,
            created_at: Utc::now(),
        };
        self.store.insert_entity(&entity).await?;
        Ok(entity)
    }

    pub async fn get_entity(&self, id: EntityId) -> Result<LedgerEntity> {
        self.store
            .find_entity(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("entity {}", id)))
    }

    /// Record a transaction. A pending transaction immediately accrues on
    /// the owning entity's total for its direction.
    pub async fn record(&self, new: NewTransaction) -> Result<LedgerTransaction> {
        if new.amount <= 0 {
            return Err(Error::validation("amount", "must be positive"));
        }
        // Reject unknown entities up front; the totals update would
        // otherwise fail after the transaction row was written.
        self.get_entity(new.entity_id).await?;

        let txn = LedgerTransaction {
            id: TransactionId::new(),
            entity_id: new.entity_id,
            amount: new.amount,
            direction: new.direction,
            status: new.status.unwrap_or(TransactionStatus::Pending),
            transaction_date: new.transaction_date.unwrap_or_else(Utc::now),
            due_date: new.due_date,
        };

        self.store.insert_transaction(&txn).await?;
        if txn.status == TransactionStatus::Pending {
            let (owed, owe) = deltas(txn.direction, txn.amount);
            self.store.adjust_totals(txn.entity_id, owed, owe).await?;
        }

        info!(
            transaction_id = %txn.id,
            entity_id = %txn.entity_id,
            amount = txn.amount,
            direction = %txn.direction,
            status = %txn.status,
            "transaction recorded"
        );
        Ok(txn)
    }

    /// Change a transaction's status, keeping totals consistent.
    ///
    /// Idempotent: repeating the same target status is a no-op, so a
    /// retried request cannot double-count. Otherwise: leaving `Pending`
    /// subtracts the amount, entering `Pending` adds it back. Totals only
    /// ever reflect currently pending transactions.
    pub async fn update_status(
        &self,
        id: TransactionId,
        new_status: TransactionStatus,
    ) -> Result<LedgerTransaction> {
        let txn = self
            .store
            .find_transaction(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))?;

        if txn.status == new_status {
            return Ok(txn);
        }

        self.store.set_transaction_status(id, new_status).await?;

        let (owed, owe) = deltas(txn.direction, txn.amount);
        if txn.status == TransactionStatus::Pending {
            self.store.adjust_totals(txn.entity_id, -owed, -owe).await?;
        }
        if new_status == TransactionStatus::Pending {
            self.store.adjust_totals(txn.entity_id, owed, owe).await?;
        }

        info!(
            transaction_id = %id,
            from = %txn.status,
            to = %new_status,
            "transaction status updated"
        );
        Ok(LedgerTransaction {
            status: new_status,
            ..txn
        })
    }

    /// Delete a transaction; a pending one releases its amount from the
    /// cached total.
    pub async fn remove(&self, id: TransactionId) -> Result<()> {
        let txn = self
            .store
            .find_transaction(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))?;

        self.store.delete_transaction(id).await?;
        if txn.status == TransactionStatus::Pending {
            let (owed, owe) = deltas(txn.direction, txn.amount);
            self.store.adjust_totals(txn.entity_id, -owed, -owe).await?;
        }

        info!(transaction_id = %id, entity_id = %txn.entity_id, "transaction deleted");
        Ok(())
    }

    pub async fn list_transactions(&self, entity_id: EntityId) -> Result<Vec<LedgerTransaction>> {
        self.store.list_transactions(entity_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deltas_by_direction() {
        assert_eq!(deltas(Direction::Income, 500), (500, 0));
        assert_eq!(deltas(Direction::Expense, 300), (0, 300));
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for s in [
            TransactionStatus::Pending,
            TransactionStatus::Paid,
            TransactionStatus::Cancelled,
        ] {
            assert_eq!(s.to_string().parse::<TransactionStatus>().unwrap(), s);
        }
        assert!("settled".parse::<TransactionStatus>().is_err());
    }
}
