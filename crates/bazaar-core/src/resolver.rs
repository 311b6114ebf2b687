//! Tenant resolution
//!
//! Maps an inbound subdomain, custom domain, or tenant ID to a tenant.
//! Resolution is a pure read used on every tenant-scoped request: no
//! reserved-word filtering, no status filtering. Status policy belongs
//! to the caller; the storefront-facing variant applies the one policy
//! the edge needs (archived is permanently gone, suspended is
//! temporarily unavailable).

use std::sync::Arc;

use crate::tenant::{Tenant, TenantId, TenantStatus};
use crate::tenant_store::TenantStore;
use crate::{Error, Result};

/// What kind of identifier an inbound request carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantIdentifier {
    Id(TenantId),
    Subdomain(String),
    CustomDomain(String),
}

impl TenantIdentifier {
    /// Classify a raw identifier string.
    ///
    /// A parseable UUID is an ID, anything containing a dot is a custom
    /// domain, everything else is treated as a subdomain.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<TenantId>() {
            return TenantIdentifier::Id(id);
        }
        if raw.contains('.') {
            TenantIdentifier::CustomDomain(raw.to_lowercase())
        } else {
            TenantIdentifier::Subdomain(raw.to_lowercase())
        }
    }
}

/// Resolves inbound identifiers to tenants.
#[derive(Clone)]
pub struct TenantResolver {
    tenants: Arc<dyn TenantStore>,
}

impl TenantResolver {
    pub fn new(tenants: Arc<dyn TenantStore>) -> Self {
        Self { tenants }
    }

    /// Resolve an identifier to its tenant, regardless of status.
    ///
    /// This is the admin-facing resolution: suspended and archived
    /// tenants resolve normally (e.g. for impersonation or support
    /// tooling).
    ///
    /// # Errors
    /// - `Error::NotFound` if no tenant matches
    pub async fn resolve(&self, identifier: &TenantIdentifier) -> Result<Tenant> {
        let found = match identifier {
            TenantIdentifier::Id(id) => self.tenants.find_by_id(*id).await?,
            TenantIdentifier::Subdomain(s) => self.tenants.find_by_subdomain(s).await?,
            TenantIdentifier::CustomDomain(d) => self.tenants.find_by_custom_domain(d).await?,
        };

        found.ok_or_else(|| Error::NotFound(format!("no tenant for {:?}", identifier)))
    }

    /// Resolve for storefront serving.
    ///
    /// # Errors
    /// - `Error::NotFound` if no tenant matches
    /// - `Error::TenantSuspended` for a suspended tenant (temporary)
    /// - `Error::TenantArchived` for an archived tenant (permanent)
    pub async fn resolve_for_storefront(&self, identifier: &TenantIdentifier) -> Result<Tenant> {
        let tenant = self.resolve(identifier).await?;
        match tenant.status {
            TenantStatus::Suspended => Err(Error::TenantSuspended(tenant.subdomain)),
            TenantStatus::Archived => Err(Error::TenantArchived(tenant.subdomain)),
            TenantStatus::Trialing | TenantStatus::Active => Ok(tenant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uuid() {
        let parsed = TenantIdentifier::parse("550e8400-e29b-41d4-a716-446655440000");
        assert!(matches!(parsed, TenantIdentifier::Id(_)));
    }

    #[test]
    fn test_parse_custom_domain() {
        let parsed = TenantIdentifier::parse("Shop.Example.com");
        assert_eq!(
            parsed,
            TenantIdentifier::CustomDomain("shop.example.com".to_string())
        );
    }

    #[test]
    fn test_parse_subdomain_lowercases() {
        let parsed = TenantIdentifier::parse("  My-Shop ");
        assert_eq!(parsed, TenantIdentifier::Subdomain("my-shop".to_string()));
    }
}
