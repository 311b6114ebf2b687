//! Tenant types, subdomain validation, and the status state machine

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

/// Unique identifier for a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Create a new random tenant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a tenant ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s)
            .map_err(|e| Error::InvalidTenant(format!("Invalid tenant ID format: {}", e)))?;
        Ok(Self(uuid))
    }
}

/// Lifecycle status of a tenant.
///
/// Transitions form a small state machine; see [`TenantStatus::can_transition_to`].
/// `Archived` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Trialing,
    Active,
    Suspended,
    Archived,
}

impl TenantStatus {
    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// Self-transitions are rejected along with everything else not
    /// explicitly allowed.
    pub fn can_transition_to(self, next: TenantStatus) -> bool {
        use TenantStatus::*;
        matches!(
            (self, next),
            (Trialing, Active)
                | (Trialing, Suspended)
                | (Trialing, Archived)
                | (Active, Suspended)
                | (Active, Archived)
                | (Suspended, Active)
                | (Suspended, Archived)
        )
    }
}

impl fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TenantStatus::Trialing => "trialing",
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Archived => "archived",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TenantStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "trialing" => Ok(TenantStatus::Trialing),
            "active" => Ok(TenantStatus::Active),
            "suspended" => Ok(TenantStatus::Suspended),
            "archived" => Ok(TenantStatus::Archived),
            other => Err(Error::validation("status", format!("unknown status '{}'", other))),
        }
    }
}

/// Subscription plan for a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantPlan {
    Starter,
    Growth,
    Enterprise,
}

impl fmt::Display for TenantPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TenantPlan::Starter => "starter",
            TenantPlan::Growth => "growth",
            TenantPlan::Enterprise => "enterprise",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TenantPlan {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "starter" => Ok(TenantPlan::Starter),
            "growth" => Ok(TenantPlan::Growth),
            "enterprise" => Ok(TenantPlan::Enterprise),
            other => Err(Error::validation("plan", format!("unknown plan '{}'", other))),
        }
    }
}

/// A recorded status transition: when it happened, who did it, and why.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub at: Option<DateTime<Utc>>,
    pub actor: Option<String>,
    pub reason: Option<String>,
}

impl StatusChange {
    pub fn now(actor: Option<String>, reason: Option<String>) -> Self {
        Self {
            at: Some(Utc::now()),
            actor,
            reason,
        }
    }
}

/// One isolated merchant sharing the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    /// Primary routing identifier. Lowercase, immutable after creation.
    pub subdomain: String,
    pub custom_domain: Option<String>,
    pub status: TenantStatus,
    pub plan: TenantPlan,
    pub contact_email: String,
    /// Email of the provisioned admin user bound to this tenant.
    pub admin_email: String,
    pub branding: serde_json::Value,
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub approved: StatusChange,
    #[serde(default)]
    pub suspended: StatusChange,
    #[serde(default)]
    pub rejected: StatusChange,
}

/// Public-safe projection of a tenant, exposed by storefront resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicTenant {
    pub id: TenantId,
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub branding: serde_json::Value,
}

impl From<&Tenant> for PublicTenant {
    fn from(t: &Tenant) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            subdomain: t.subdomain.clone(),
            status: t.status,
            branding: t.branding.clone(),
        }
    }
}

static SUBDOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$").unwrap());

/// Subdomains that can never be claimed by a tenant.
///
/// Checked only at creation/validation time; resolution never consults
/// this list.
pub const RESERVED_SUBDOMAINS: &[&str] = &[
    "www", "admin", "api", "app", "mail", "ftp", "blog", "shop", "store",
    "dashboard", "support", "help", "docs", "status", "dev", "staging",
    "test", "demo",
];

/// Why a subdomain is not available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    Invalid,
    Reserved,
    Taken,
}

/// Result of a subdomain availability check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubdomainAvailability {
    pub subdomain: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnavailableReason>,
}

impl SubdomainAvailability {
    pub fn available(subdomain: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            available: true,
            reason: None,
        }
    }

    pub fn unavailable(subdomain: impl Into<String>, reason: UnavailableReason) -> Self {
        Self {
            subdomain: subdomain.into(),
            available: false,
            reason: Some(reason),
        }
    }
}

/// Validate and normalize a subdomain.
///
/// Returns the lowercase form on success. Rules: 3-30 chars,
/// `[a-z0-9][a-z0-9-]*[a-z0-9]`, not in [`RESERVED_SUBDOMAINS`].
pub fn normalize_subdomain(raw: &str) -> Result<String> {
    let subdomain = raw.trim().to_lowercase();
    if subdomain.len() < 3 {
        return Err(Error::validation(
            "subdomain",
            "must be at least 3 characters",
        ));
    }
    if subdomain.len() > 30 {
        return Err(Error::validation(
            "subdomain",
            "must be at most 30 characters",
        ));
    }
    if !SUBDOMAIN_RE.is_match(&subdomain) {
        return Err(Error::validation(
            "subdomain",
            "must contain only lowercase letters, digits and hyphens, and may not start or end with a hyphen",
        ));
    }
    if RESERVED_SUBDOMAINS.contains(&subdomain.as_str()) {
        return Err(Error::validation("subdomain", "this subdomain is reserved"));
    }
    Ok(subdomain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_roundtrip() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id: TenantId = uuid_str.parse().unwrap();
        assert_eq!(id.to_string(), uuid_str);
    }

    #[test]
    fn test_tenant_id_invalid_string() {
        let result: Result<TenantId> = "not-a-uuid".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_status_transitions() {
        use TenantStatus::*;
        assert!(Trialing.can_transition_to(Active));
        assert!(Trialing.can_transition_to(Suspended));
        assert!(Trialing.can_transition_to(Archived));
        assert!(Active.can_transition_to(Suspended));
        assert!(Active.can_transition_to(Archived));
        assert!(Suspended.can_transition_to(Active));
        assert!(Suspended.can_transition_to(Archived));

        // archived is terminal
        assert!(!Archived.can_transition_to(Active));
        assert!(!Archived.can_transition_to(Trialing));
        assert!(!Archived.can_transition_to(Suspended));

        // no self-transitions, no reverse into trialing
        assert!(!Active.can_transition_to(Active));
        assert!(!Active.can_transition_to(Trialing));
        assert!(!Suspended.can_transition_to(Trialing));
    }

    #[test]
    fn test_normalize_subdomain_valid() {
        assert_eq!(normalize_subdomain("my-shop").unwrap(), "my-shop");
        assert_eq!(normalize_subdomain("My-Shop").unwrap(), "my-shop");
        assert_eq!(normalize_subdomain("  abc  ").unwrap(), "abc");
        assert_eq!(normalize_subdomain("a1b").unwrap(), "a1b");
    }

    #[test]
    fn test_normalize_subdomain_length() {
        assert!(normalize_subdomain("ab").is_err());
        assert!(normalize_subdomain(&"a".repeat(31)).is_err());
        assert!(normalize_subdomain(&"a".repeat(30)).is_ok());
    }

    #[test]
    fn test_normalize_subdomain_pattern() {
        assert!(normalize_subdomain("-abc").is_err());
        assert!(normalize_subdomain("abc-").is_err());
        assert!(normalize_subdomain("a_bc").is_err());
        assert!(normalize_subdomain("a bc").is_err());
    }

    #[test]
    fn test_normalize_subdomain_reserved() {
        for reserved in ["www", "admin", "api"] {
            let err = normalize_subdomain(reserved).unwrap_err();
            assert!(matches!(err, Error::Validation { .. }));
        }
    }

    #[test]
    fn test_public_tenant_projection() {
        let tenant = Tenant {
            id: TenantId::new(),
            name: "Acme".to_string(),
            subdomain: "acme".to_string(),
            custom_domain: Some("shop.acme.com".to_string()),
            status: TenantStatus::Active,
            plan: TenantPlan::Growth,
            contact_email: "owner@acme.com".to_string(),
            admin_email: "admin@acme.com".to_string(),
            branding: serde_json::json!({"color": "#fff"}),
            settings: serde_json::json!({}),
            created_at: Utc::now(),
            approved: StatusChange::default(),
            suspended: StatusChange::default(),
            rejected: StatusChange::default(),
        };

        let public = PublicTenant::from(&tenant);
        let json = serde_json::to_value(&public).unwrap();
        assert_eq!(json["subdomain"], "acme");
        assert!(json.get("admin_email").is_none());
        assert!(json.get("contact_email").is_none());
    }
}
