//! Tenant provisioning and lifecycle
//!
//! Creating a tenant and creating its bound admin user are one logical
//! operation. There is no multi-store transaction here, so provisioning
//! is a two-step saga with compensation: if the admin user write fails,
//! the freshly inserted tenant row is deleted before the error is
//! returned. No orphaned tenant may survive a failed provision.
//!
//! Deletion cascades dependents-first (documents, users, then the tenant
//! row) with every step idempotent, so a crashed cascade is completed by
//! simply calling delete again.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::document_store::TenantDocumentStore;
use crate::tenant::{
    normalize_subdomain, StatusChange, SubdomainAvailability, Tenant, TenantId, TenantPlan,
    TenantStatus, UnavailableReason, RESERVED_SUBDOMAINS,
};
use crate::tenant_store::{TenantStore, TransitionKind};
use crate::user_store::{AdminUser, UserStore};
use crate::{Error, Result};

/// Length of the trial granted to self-registered tenants.
pub const TRIAL_PERIOD_DAYS: i64 = 14;

/// Payload for admin-created tenants.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
    pub name: String,
    pub subdomain: String,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub plan: Option<TenantPlan>,
    pub contact_email: String,
    pub admin_email: String,
    pub admin_password: String,
}

/// Payload for public self-registration. Plan and status are not caller
/// controlled: starter plan, trialing status.
#[derive(Debug, Clone, Deserialize)]
pub struct SelfRegistration {
    pub name: String,
    pub subdomain: String,
    pub contact_email: String,
    pub admin_email: String,
    pub admin_password: String,
}

/// Result of self-registration. The trial end date is informational for
/// the caller; nothing in this system schedules the transition.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedTenant {
    pub tenant: Tenant,
    pub trial_ends_at: DateTime<Utc>,
}

/// Mutable tenant fields. Omitted fields are left unchanged; the
/// subdomain is immutable and deliberately absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub plan: Option<TenantPlan>,
    #[serde(default)]
    pub branding: Option<serde_json::Value>,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

/// Creates and destroys tenants together with their dependent records.
#[derive(Clone)]
pub struct TenantProvisioner {
    tenants: Arc<dyn TenantStore>,
    users: Arc<dyn UserStore>,
    documents: Arc<dyn TenantDocumentStore>,
}

impl TenantProvisioner {
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        users: Arc<dyn UserStore>,
        documents: Arc<dyn TenantDocumentStore>,
    ) -> Self {
        Self {
            tenants,
            users,
            documents,
        }
    }

    /// Create a tenant on behalf of a platform admin.
    ///
    /// Defaults: chosen plan (or starter), `active` status.
    pub async fn create_tenant(&self, payload: NewTenant) -> Result<Tenant> {
        let plan = payload.plan.unwrap_or(TenantPlan::Starter);
        self.provision(payload, plan, TenantStatus::Active).await
    }

    /// Public self-registration: starter plan, trialing status, 14-day
    /// trial end date returned to the caller.
    pub async fn register_tenant(&self, payload: SelfRegistration) -> Result<ProvisionedTenant> {
        let payload = NewTenant {
            name: payload.name,
            subdomain: payload.subdomain,
            custom_domain: None,
            plan: None,
            contact_email: payload.contact_email,
            admin_email: payload.admin_email,
            admin_password: payload.admin_password,
        };
        let tenant = self
            .provision(payload, TenantPlan::Starter, TenantStatus::Trialing)
            .await?;
        let trial_ends_at = tenant.created_at + Duration::days(TRIAL_PERIOD_DAYS);
        Ok(ProvisionedTenant {
            tenant,
            trial_ends_at,
        })
    }

    async fn provision(
        &self,
        payload: NewTenant,
        plan: TenantPlan,
        status: TenantStatus,
    ) -> Result<Tenant> {
        let subdomain = normalize_subdomain(&payload.subdomain)?;
        validate_email("admin_email", &payload.admin_email)?;
        validate_email("contact_email", &payload.contact_email)?;
        if payload.name.trim().is_empty() {
            return Err(Error::validation("name", "must not be empty"));
        }
        if payload.admin_password.len() < 8 {
            return Err(Error::validation(
                "admin_password",
                "must be at least 8 characters",
            ));
        }

        // Availability pre-checks. These are an optimization for friendly
        // errors; the store's unique indexes remain the final arbiter
        // under concurrent creation.
        if self.tenants.find_by_subdomain(&subdomain).await?.is_some() {
            return Err(Error::Conflict(format!(
                "subdomain '{}' is already taken",
                subdomain
            )));
        }
        let custom_domain = match &payload.custom_domain {
            Some(d) => {
                let d = d.trim().to_lowercase();
                if self.tenants.find_by_custom_domain(&d).await?.is_some() {
                    return Err(Error::Conflict(format!(
                        "custom domain '{}' is already taken",
                        d
                    )));
                }
                Some(d)
            }
            None => None,
        };
        if self
            .users
            .find_by_email(&payload.admin_email)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(
                "admin email is already bound to another tenant".to_string(),
            ));
        }

        let tenant = Tenant {
            id: TenantId::new(),
            name: payload.name.trim().to_string(),
            subdomain,
            custom_domain,
            status,
            plan,
            contact_email: payload.contact_email.trim().to_lowercase(),
            admin_email: payload.admin_email.trim().to_lowercase(),
            branding: serde_json::json!({}),
            settings: serde_json::json!({}),
            created_at: Utc::now(),
            approved: StatusChange::default(),
            suspended: StatusChange::default(),
            rejected: StatusChange::default(),
        };

        self.tenants.insert(&tenant).await?;

        let admin = AdminUser {
            id: uuid::Uuid::new_v4(),
            tenant_id: tenant.id,
            email: tenant.admin_email.clone(),
            password_hash: hash_password(&payload.admin_password)?,
            created_at: Utc::now(),
        };

        // Saga compensation: a tenant with no admin must not survive.
        if let Err(e) = self.users.insert_admin(&admin).await {
            warn!(
                tenant_id = %tenant.id,
                subdomain = %tenant.subdomain,
                error = %e,
                "admin user creation failed, rolling back tenant"
            );
            if let Err(rollback) = self.tenants.delete(tenant.id).await {
                warn!(
                    tenant_id = %tenant.id,
                    error = %rollback,
                    "tenant rollback failed; orphan will be removed on retry"
                );
            }
            return Err(e);
        }

        info!(
            tenant_id = %tenant.id,
            subdomain = %tenant.subdomain,
            status = %tenant.status,
            plan = %tenant.plan,
            "tenant provisioned"
        );
        Ok(tenant)
    }

    /// Delete a tenant and everything it owns.
    ///
    /// Cascade order: documents, users, then the tenant row, so a crash
    /// mid-cascade never leaves a tenant record pointing at missing data.
    /// Every step is delete-if-exists, so a repeated call after a crash
    /// finishes the remainder without erroring.
    pub async fn delete_tenant(&self, id: TenantId) -> Result<()> {
        let documents = self.documents.delete_all(id).await?;
        let users = self.users.delete_all_for_tenant(id).await?;
        let removed = self.tenants.delete(id).await?;
        info!(
            tenant_id = %id,
            documents,
            users,
            tenant_removed = removed,
            "tenant deleted"
        );
        Ok(())
    }

    /// Apply a status transition, enforcing the state machine.
    pub async fn update_tenant_status(
        &self,
        id: TenantId,
        new_status: TenantStatus,
        actor: Option<String>,
        reason: Option<String>,
    ) -> Result<Tenant> {
        let tenant = self
            .tenants
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("tenant {}", id)))?;

        if !tenant.status.can_transition_to(new_status) {
            return Err(Error::InvalidTransition {
                from: tenant.status.to_string(),
                to: new_status.to_string(),
            });
        }

        let kind = match new_status {
            TenantStatus::Active => Some(TransitionKind::Approved),
            TenantStatus::Suspended => Some(TransitionKind::Suspended),
            TenantStatus::Archived => Some(TransitionKind::Rejected),
            TenantStatus::Trialing => None,
        };
        self.tenants
            .set_status(id, new_status, kind, StatusChange::now(actor, reason))
            .await?;

        info!(tenant_id = %id, from = %tenant.status, to = %new_status, "tenant status updated");
        self.tenants
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("tenant {}", id)))
    }

    /// Update mutable tenant fields. The subdomain never changes.
    pub async fn update_tenant(&self, id: TenantId, update: TenantUpdate) -> Result<Tenant> {
        let mut tenant = self
            .tenants
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("tenant {}", id)))?;

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(Error::validation("name", "must not be empty"));
            }
            tenant.name = name.trim().to_string();
        }
        if let Some(domain) = update.custom_domain {
            let domain = domain.trim().to_lowercase();
            let existing = self.tenants.find_by_custom_domain(&domain).await?;
            if existing.as_ref().is_some_and(|t| t.id != id) {
                return Err(Error::Conflict(format!(
                    "custom domain '{}' is already taken",
                    domain
                )));
            }
            tenant.custom_domain = Some(domain);
        }
        if let Some(email) = update.contact_email {
            validate_email("contact_email", &email)?;
            tenant.contact_email = email.trim().to_lowercase();
        }
        if let Some(plan) = update.plan {
            tenant.plan = plan;
        }
        if let Some(branding) = update.branding {
            tenant.branding = branding;
        }
        if let Some(settings) = update.settings {
            tenant.settings = settings;
        }

        self.tenants.update(&tenant).await?;
        Ok(tenant)
    }

    /// Availability check backing `GET /tenants/check-subdomain/{subdomain}`.
    ///
    /// Distinguishes malformed, reserved, and taken so the UI can explain
    /// the rejection.
    pub async fn check_subdomain(&self, raw: &str) -> Result<SubdomainAvailability> {
        let candidate = raw.trim().to_lowercase();
        if RESERVED_SUBDOMAINS.contains(&candidate.as_str()) {
            return Ok(SubdomainAvailability::unavailable(
                candidate,
                UnavailableReason::Reserved,
            ));
        }
        let normalized = match normalize_subdomain(&candidate) {
            Ok(s) => s,
            Err(_) => {
                return Ok(SubdomainAvailability::unavailable(
                    candidate,
                    UnavailableReason::Invalid,
                ))
            }
        };
        if self.tenants.find_by_subdomain(&normalized).await?.is_some() {
            return Ok(SubdomainAvailability::unavailable(
                normalized,
                UnavailableReason::Taken,
            ));
        }
        Ok(SubdomainAvailability::available(normalized))
    }
}

fn validate_email(field: &str, email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(Error::validation(field, "must be a valid email address"));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Credential(format!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("admin_email", "a@b.com").is_ok());
        assert!(validate_email("admin_email", "").is_err());
        assert!(validate_email("admin_email", "nope").is_err());
        assert!(validate_email("admin_email", "@b.com").is_err());
        assert!(validate_email("admin_email", "a@").is_err());
    }

    #[test]
    fn test_hash_password_is_phc_format() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
    }
}
