//! SQLite implementation of the tenant store

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use bazaar_core::tenant::{StatusChange, Tenant, TenantId, TenantStatus};
use bazaar_core::tenant_store::{TenantStore, TransitionKind};
use bazaar_core::{Error, Result};

use crate::{map_sqlx_error, parse_datetime, parse_uuid};

#[derive(Clone)]
pub struct SqliteTenantStore {
    pool: SqlitePool,
}

impl SqliteTenantStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn status_change(row: &SqliteRow, prefix: &str) -> Result<StatusChange> {
    let at: Option<String> = row
        .try_get(format!("{}_at", prefix).as_str())
        .map_err(|e| Error::Database(e.to_string()))?;
    let actor: Option<String> = row
        .try_get(format!("{}_actor", prefix).as_str())
        .map_err(|e| Error::Database(e.to_string()))?;
    let reason: Option<String> = row
        .try_get(format!("{}_reason", prefix).as_str())
        .map_err(|e| Error::Database(e.to_string()))?;
    let at = match at {
        Some(raw) => Some(parse_datetime(&raw)?),
        None => None,
    };
    Ok(StatusChange { at, actor, reason })
}

fn tenant_from_row(row: &SqliteRow) -> Result<Tenant> {
    let get_text = |column: &str| -> Result<String> {
        row.try_get::<String, _>(column)
            .map_err(|e| Error::Database(format!("column {}: {}", column, e)))
    };

    let status: TenantStatus = get_text("status")?.parse()?;
    let plan = get_text("plan")?.parse()?;
    let branding = serde_json::from_str(&get_text("branding")?)?;
    let settings = serde_json::from_str(&get_text("settings")?)?;
    let custom_domain: Option<String> = row
        .try_get("custom_domain")
        .map_err(|e| Error::Database(e.to_string()))?;

    Ok(Tenant {
        id: TenantId::from_uuid(parse_uuid(&get_text("id")?)?),
        name: get_text("name")?,
        subdomain: get_text("subdomain")?,
        custom_domain,
        status,
        plan,
        contact_email: get_text("contact_email")?,
        admin_email: get_text("admin_email")?,
        branding,
        settings,
        created_at: parse_datetime(&get_text("created_at")?)?,
        approved: status_change(row, "approved")?,
        suspended: status_change(row, "suspended")?,
        rejected: status_change(row, "rejected")?,
    })
}

#[async_trait]
impl TenantStore for SqliteTenantStore {
    async fn insert(&self, tenant: &Tenant) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tenants (
                id, name, subdomain, custom_domain, status, plan,
                contact_email, admin_email, branding, settings, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(tenant.id.to_string())
        .bind(&tenant.name)
        .bind(tenant.subdomain.to_lowercase())
        .bind(&tenant.custom_domain)
        .bind(tenant.status.to_string())
        .bind(tenant.plan.to_string())
        .bind(&tenant.contact_email)
        .bind(&tenant.admin_email)
        .bind(tenant.branding.to_string())
        .bind(tenant.settings.to_string())
        .bind(tenant.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert tenant", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>> {
        let row = sqlx::query("SELECT * FROM tenants WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find tenant by id", e))?;

        row.as_ref().map(tenant_from_row).transpose()
    }

    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>> {
        // Stored lowercase on insert; lowering the probe makes the match
        // case-insensitive.
        let row = sqlx::query("SELECT * FROM tenants WHERE subdomain = ?1")
            .bind(subdomain.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find tenant by subdomain", e))?;

        row.as_ref().map(tenant_from_row).transpose()
    }

    async fn find_by_custom_domain(&self, domain: &str) -> Result<Option<Tenant>> {
        let row = sqlx::query("SELECT * FROM tenants WHERE custom_domain = ?1")
            .bind(domain.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find tenant by custom domain", e))?;

        row.as_ref().map(tenant_from_row).transpose()
    }

    async fn update(&self, tenant: &Tenant) -> Result<()> {
        // Subdomain deliberately absent from the SET list: immutable.
        let result = sqlx::query(
            r#"
            UPDATE tenants
            SET name = ?2,
                custom_domain = ?3,
                plan = ?4,
                contact_email = ?5,
                branding = ?6,
                settings = ?7
            WHERE id = ?1
            "#,
        )
        .bind(tenant.id.to_string())
        .bind(&tenant.name)
        .bind(&tenant.custom_domain)
        .bind(tenant.plan.to_string())
        .bind(&tenant.contact_email)
        .bind(tenant.branding.to_string())
        .bind(tenant.settings.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update tenant", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("tenant {}", tenant.id)));
        }
        Ok(())
    }

    async fn set_status(
        &self,
        id: TenantId,
        status: TenantStatus,
        kind: Option<TransitionKind>,
        change: StatusChange,
    ) -> Result<()> {
        let prefix = match kind {
            Some(TransitionKind::Approved) => Some("approved"),
            Some(TransitionKind::Suspended) => Some("suspended"),
            Some(TransitionKind::Rejected) => Some("rejected"),
            None => None,
        };

        let query = match prefix {
            Some(prefix) => format!(
                "UPDATE tenants SET status = ?2, {p}_at = ?3, {p}_actor = ?4, {p}_reason = ?5 WHERE id = ?1",
                p = prefix
            ),
            None => "UPDATE tenants SET status = ?2 WHERE id = ?1".to_string(),
        };

        let mut q = sqlx::query(&query)
            .bind(id.to_string())
            .bind(status.to_string());
        if prefix.is_some() {
            q = q
                .bind(change.at.map(|dt| dt.to_rfc3339()))
                .bind(change.actor)
                .bind(change.reason);
        }

        let result = q
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set tenant status", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("tenant {}", id)));
        }
        Ok(())
    }

    async fn delete(&self, id: TenantId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete tenant", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Tenant>> {
        let rows = sqlx::query("SELECT * FROM tenants ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list tenants", e))?;

        rows.iter().map(tenant_from_row).collect()
    }
}
