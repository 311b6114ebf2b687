//! SQLite implementation of the ledger store
//!
//! Cached totals are adjusted with a single in-place
//! `UPDATE ... SET total = total + ?` so concurrent adjustments
//! serialize at the database instead of racing through a
//! read-modify-write in application code.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use bazaar_core::ledger::{
    EntityId, LedgerEntity, LedgerStore, LedgerTransaction, PendingSums, TransactionId,
    TransactionStatus,
};
use bazaar_core::{Error, Result};

use crate::{map_sqlx_error, parse_datetime, parse_uuid};

#[derive(Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn entity_from_row(row: &SqliteRow) -> Result<LedgerEntity> {
    let get_text = |column: &str| -> Result<String> {
        row.try_get::<String, _>(column)
            .map_err(|e| Error::Database(format!("column {}: {}", column, e)))
    };

    Ok(LedgerEntity {
        id: EntityId(parse_uuid(&get_text("id")?)?),
        name: get_text("name")?,
        phone: get_text("phone")?,
        entity_type: get_text("entity_type")?,
        total_owed_to_me: row
            .try_get("total_owed_to_me")
            .map_err(|e| Error::Database(e.to_string()))?,
        total_i_owe_them: row
            .try_get("total_i_owe_them")
            .map_err(|e| Error::Database(e.to_string()))?,
        created_at: parse_datetime(&get_text("created_at")?)?,
    })
}

fn transaction_from_row(row: &SqliteRow) -> Result<LedgerTransaction> {
    let get_text = |column: &str| -> Result<String> {
        row.try_get::<String, _>(column)
            .map_err(|e| Error::Database(format!("column {}: {}", column, e)))
    };

    let due_date: Option<String> = row
        .try_get("due_date")
        .map_err(|e| Error::Database(e.to_string()))?;

    Ok(LedgerTransaction {
        id: TransactionId(parse_uuid(&get_text("id")?)?),
        entity_id: EntityId(parse_uuid(&get_text("entity_id")?)?),
        amount: row
            .try_get("amount")
            .map_err(|e| Error::Database(e.to_string()))?,
        direction: get_text("direction")?.parse()?,
        status: get_text("status")?.parse()?,
        transaction_date: parse_datetime(&get_text("transaction_date")?)?,
        due_date: due_date.as_deref().map(parse_datetime).transpose()?,
    })
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn insert_entity(&self, entity: &LedgerEntity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entities (
                id, name, phone, entity_type,
                total_owed_to_me, total_i_owe_them, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(entity.id.to_string())
        .bind(&entity.name)
        .bind(&entity.phone)
        .bind(&entity.entity_type)
        .bind(entity.total_owed_to_me)
        .bind(entity.total_i_owe_them)
        .bind(entity.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert entity", e))?;

        Ok(())
    }

    async fn find_entity(&self, id: EntityId) -> Result<Option<LedgerEntity>> {
        let row = sqlx::query("SELECT * FROM ledger_entities WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find entity", e))?;

        row.as_ref().map(entity_from_row).transpose()
    }

    async fn adjust_totals(
        &self,
        entity_id: EntityId,
        owed_delta: i64,
        owe_delta: i64,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE ledger_entities
            SET total_owed_to_me = total_owed_to_me + ?2,
                total_i_owe_them = total_i_owe_them + ?3
            WHERE id = ?1
            "#,
        )
        .bind(entity_id.to_string())
        .bind(owed_delta)
        .bind(owe_delta)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("adjust entity totals", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("entity {}", entity_id)));
        }
        Ok(())
    }

    async fn insert_transaction(&self, txn: &LedgerTransaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_transactions (
                id, entity_id, amount, direction, status,
                transaction_date, due_date
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(txn.id.to_string())
        .bind(txn.entity_id.to_string())
        .bind(txn.amount)
        .bind(txn.direction.to_string())
        .bind(txn.status.to_string())
        .bind(txn.transaction_date.to_rfc3339())
        .bind(txn.due_date.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert transaction", e))?;

        Ok(())
    }

    async fn find_transaction(&self, id: TransactionId) -> Result<Option<LedgerTransaction>> {
        let row = sqlx::query("SELECT * FROM ledger_transactions WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find transaction", e))?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn set_transaction_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE ledger_transactions SET status = ?2 WHERE id = ?1")
            .bind(id.to_string())
            .bind(status.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set transaction status", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("transaction {}", id)));
        }
        Ok(())
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ledger_transactions WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete transaction", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_transactions(&self, entity_id: EntityId) -> Result<Vec<LedgerTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM ledger_transactions
            WHERE entity_id = ?1
            ORDER BY transaction_date ASC
            "#,
        )
        .bind(entity_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list transactions", e))?;

        rows.iter().map(transaction_from_row).collect()
    }

    async fn pending_sums(&self, entity_id: EntityId) -> Result<PendingSums> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN direction = 'income' THEN amount ELSE 0 END), 0)
                    AS owed_to_me,
                COALESCE(SUM(CASE WHEN direction = 'expense' THEN amount ELSE 0 END), 0)
                    AS i_owe_them
            FROM ledger_transactions
            WHERE entity_id = ?1 AND status = 'pending'
            "#,
        )
        .bind(entity_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("sum pending transactions", e))?;

        Ok(PendingSums {
            owed_to_me: row
                .try_get("owed_to_me")
                .map_err(|e| Error::Database(e.to_string()))?,
            i_owe_them: row
                .try_get("i_owe_them")
                .map_err(|e| Error::Database(e.to_string()))?,
        })
    }
}
