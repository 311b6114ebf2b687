//! SQLite implementation of the tenant document store
//!
//! `save` is a plain upsert (`INSERT ... ON CONFLICT DO UPDATE`), which
//! is exactly the last-write-wins contract: whichever statement commits
//! later owns the row. The `version` column only exists for the opt-in
//! compare-and-swap path; plain saves bump it but never check it.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use bazaar_core::document_store::TenantDocumentStore;
use bazaar_core::tenant::TenantId;
use bazaar_core::{Error, Result};

use crate::map_sqlx_error;

#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantDocumentStore for SqliteDocumentStore {
    async fn get(&self, tenant_id: TenantId, key: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT data FROM tenant_documents WHERE tenant_id = ?1 AND key = ?2")
            .bind(tenant_id.to_string())
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get document", e))?;

        match row {
            Some(row) => {
                let raw: String = row
                    .try_get("data")
                    .map_err(|e| Error::Database(e.to_string()))?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn get_with_version(
        &self,
        tenant_id: TenantId,
        key: &str,
    ) -> Result<Option<(Value, i64)>> {
        let row = sqlx::query(
            "SELECT data, version FROM tenant_documents WHERE tenant_id = ?1 AND key = ?2",
        )
        .bind(tenant_id.to_string())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get document", e))?;

        match row {
            Some(row) => {
                let raw: String = row
                    .try_get("data")
                    .map_err(|e| Error::Database(e.to_string()))?;
                let version: i64 = row
                    .try_get("version")
                    .map_err(|e| Error::Database(e.to_string()))?;
                Ok(Some((serde_json::from_str(&raw)?, version)))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, tenant_id: TenantId, key: &str, data: &Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tenant_documents (tenant_id, key, data, version, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            ON CONFLICT (tenant_id, key) DO UPDATE
            SET data = excluded.data,
                version = tenant_documents.version + 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(key)
        .bind(data.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("save document", e))?;

        Ok(())
    }

    async fn save_if_version(
        &self,
        tenant_id: TenantId,
        key: &str,
        data: &Value,
        expected_version: i64,
    ) -> Result<bool> {
        // expected_version == 0 means "create, must not exist yet"
        if expected_version == 0 {
            let result = sqlx::query(
                r#"
                INSERT INTO tenant_documents (tenant_id, key, data, version, updated_at)
                VALUES (?1, ?2, ?3, 1, ?4)
                ON CONFLICT (tenant_id, key) DO NOTHING
                "#,
            )
            .bind(tenant_id.to_string())
            .bind(key)
            .bind(data.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("save document (cas)", e))?;

            return Ok(result.rows_affected() > 0);
        }

        let result = sqlx::query(
            r#"
            UPDATE tenant_documents
            SET data = ?3,
                version = version + 1,
                updated_at = ?4
            WHERE tenant_id = ?1 AND key = ?2 AND version = ?5
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(key)
        .bind(data.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("save document (cas)", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_keys(&self, tenant_id: TenantId) -> Result<Vec<String>> {
        let rows =
            sqlx::query("SELECT key FROM tenant_documents WHERE tenant_id = ?1 ORDER BY key ASC")
                .bind(tenant_id.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("list document keys", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("key")
                    .map_err(|e| Error::Database(e.to_string()))
            })
            .collect()
    }

    async fn delete(&self, tenant_id: TenantId, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tenant_documents WHERE tenant_id = ?1 AND key = ?2")
            .bind(tenant_id.to_string())
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete document", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, tenant_id: TenantId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tenant_documents WHERE tenant_id = ?1")
            .bind(tenant_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete tenant documents", e))?;

        Ok(result.rows_affected())
    }
}
