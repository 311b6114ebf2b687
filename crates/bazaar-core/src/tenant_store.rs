//! Tenant store trait
//!
//! The `TenantStore` trait abstracts persistence of tenant records.
//! Uniqueness of `subdomain` and `custom_domain` is enforced by the
//! storage layer: the application-level availability checks in the
//! provisioner are an optimization, and the store's unique indexes are
//! the final arbiter under concurrent creation.

use async_trait::async_trait;

use crate::tenant::{StatusChange, Tenant, TenantId, TenantStatus};
use crate::Result;

/// Which timestamped transition record a status change should update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Approved,
    Suspended,
    Rejected,
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Insert a new tenant.
    ///
    /// # Errors
    /// - `Error::Conflict` if the subdomain or custom domain is already taken
    /// - `Error::Database` for storage failures
    async fn insert(&self, tenant: &Tenant) -> Result<()>;

    /// Look up a tenant by ID. `Ok(None)` when absent.
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>>;

    /// Look up a tenant by subdomain, case-insensitively.
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>>;

    /// Look up a tenant by custom domain.
    async fn find_by_custom_domain(&self, domain: &str) -> Result<Option<Tenant>>;

    /// Replace the mutable fields of an existing tenant.
    ///
    /// The subdomain is immutable: implementations must not change it even
    /// if the passed record differs.
    ///
    /// # Errors
    /// - `Error::NotFound` if the tenant does not exist
    /// - `Error::Conflict` if the custom domain is already taken
    async fn update(&self, tenant: &Tenant) -> Result<()>;

    /// Set the status and record the transition metadata.
    ///
    /// # Errors
    /// - `Error::NotFound` if the tenant does not exist
    async fn set_status(
        &self,
        id: TenantId,
        status: TenantStatus,
        kind: Option<TransitionKind>,
        change: StatusChange,
    ) -> Result<()>;

    /// Delete the tenant record. Idempotent: deleting an absent tenant
    /// succeeds and reports `false`.
    async fn delete(&self, id: TenantId) -> Result<bool>;

    /// List all tenants, oldest first.
    async fn list(&self) -> Result<Vec<Tenant>>;
}
