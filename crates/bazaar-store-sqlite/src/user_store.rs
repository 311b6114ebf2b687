//! SQLite implementation of the admin user store

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use bazaar_core::tenant::TenantId;
use bazaar_core::user_store::{AdminUser, UserStore};
use bazaar_core::{Error, Result};

use crate::{map_sqlx_error, parse_datetime, parse_uuid};

#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &SqliteRow) -> Result<AdminUser> {
    let get_text = |column: &str| -> Result<String> {
        row.try_get::<String, _>(column)
            .map_err(|e| Error::Database(format!("column {}: {}", column, e)))
    };

    Ok(AdminUser {
        id: parse_uuid(&get_text("id")?)?,
        tenant_id: TenantId::from_uuid(parse_uuid(&get_text("tenant_id")?)?),
        email: get_text("email")?,
        password_hash: get_text("password_hash")?,
        created_at: parse_datetime(&get_text("created_at")?)?,
    })
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn insert_admin(&self, user: &AdminUser) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_users (id, tenant_id, email, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(user.id.to_string())
        .bind(user.tenant_id.to_string())
        .bind(user.email.to_lowercase())
        .bind(&user.password_hash)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert admin user", e))?;

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AdminUser>> {
        let row = sqlx::query("SELECT * FROM admin_users WHERE email = ?1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find user by email", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn delete_all_for_tenant(&self, tenant_id: TenantId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM admin_users WHERE tenant_id = ?1")
            .bind(tenant_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete tenant users", e))?;

        Ok(result.rows_affected())
    }
}
