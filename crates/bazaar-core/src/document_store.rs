//! Generic tenant-scoped document store trait
//!
//! Every feature (catalog, website config, inventory thresholds, landing
//! pages, ...) persists its data through this one store as an arbitrary
//! JSON value keyed by `(tenant_id, key)`. The store guarantees exactly
//! one document per key per tenant and nothing else: the shape of `data`
//! is owned entirely by the feature layer.
//!
//! # Concurrency
//! `save` is last-write-wins with no version token. Two concurrent saves
//! for the same key race, and the later commit silently replaces the
//! earlier one. Callers that need stronger guarantees for specific keys
//! opt into the compare-and-swap variant (`save_if_version`); the default
//! contract is deliberate and must not change underneath existing callers.

use async_trait::async_trait;
use serde_json::Value;

use crate::tenant::TenantId;
use crate::Result;

#[async_trait]
pub trait TenantDocumentStore: Send + Sync {
    /// Fetch the document for `(tenant_id, key)`.
    ///
    /// Absence is a normal state (an unconfigured feature), reported as
    /// `Ok(None)`, never as an error.
    async fn get(&self, tenant_id: TenantId, key: &str) -> Result<Option<Value>>;

    /// Fetch the document and its current version, for CAS callers.
    async fn get_with_version(
        &self,
        tenant_id: TenantId,
        key: &str,
    ) -> Result<Option<(Value, i64)>>;

    /// Upsert the document: create if absent, otherwise replace `data`
    /// wholesale and bump `updated_at`. Full replacement, not a merge.
    async fn save(&self, tenant_id: TenantId, key: &str, data: &Value) -> Result<()>;

    /// Compare-and-swap upsert: succeeds only if the stored version equals
    /// `expected_version` (use 0 for "must not exist yet"). Returns `false`
    /// on version mismatch instead of erroring.
    async fn save_if_version(
        &self,
        tenant_id: TenantId,
        key: &str,
        data: &Value,
        expected_version: i64,
    ) -> Result<bool>;

    /// List the keys a tenant has documents for.
    async fn list_keys(&self, tenant_id: TenantId) -> Result<Vec<String>>;

    /// Delete one document. Idempotent; reports whether a row was removed.
    async fn delete(&self, tenant_id: TenantId, key: &str) -> Result<bool>;

    /// Delete every document owned by a tenant. Idempotent; returns the
    /// number of rows removed (0 on repeat calls).
    async fn delete_all(&self, tenant_id: TenantId) -> Result<u64>;
}

/// Fetch a document, falling back to `default` when absent.
///
/// Convenience wrapper matching how feature code reads config-like keys.
pub async fn get_or(
    store: &dyn TenantDocumentStore,
    tenant_id: TenantId,
    key: &str,
    default: Value,
) -> Result<Value> {
    Ok(store.get(tenant_id, key).await?.unwrap_or(default))
}
