//! Admin user store trait
//!
//! Provisioning binds exactly one admin user to each tenant at creation
//! time. The store only covers what the tenant lifecycle needs: insert,
//! lookup by email, and the idempotent cascade delete.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenant::TenantId;
use crate::Result;

/// An administrator account bound to a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub email: String,
    /// Argon2 PHC-format hash. Never serialized into API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert an admin user bound to a tenant.
    ///
    /// # Errors
    /// - `Error::Conflict` if the email is already bound to a tenant
    async fn insert_admin(&self, user: &AdminUser) -> Result<()>;

    /// Look up a user by email (case-insensitive). `Ok(None)` when absent.
    async fn find_by_email(&self, email: &str) -> Result<Option<AdminUser>>;

    /// Delete every user bound to a tenant. Idempotent; returns the number
    /// of rows removed.
    async fn delete_all_for_tenant(&self, tenant_id: TenantId) -> Result<u64>;
}
