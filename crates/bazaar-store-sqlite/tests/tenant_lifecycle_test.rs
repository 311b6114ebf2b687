//! Tenant provisioning, resolution, and lifecycle over the SQLite stores

use std::sync::Arc;

use bazaar_core::document_store::TenantDocumentStore;
use bazaar_core::provisioner::{NewTenant, SelfRegistration, TenantProvisioner};
use bazaar_core::resolver::{TenantIdentifier, TenantResolver};
use bazaar_core::tenant::{TenantId, TenantPlan, TenantStatus, UnavailableReason};
use bazaar_core::tenant_store::TenantStore;
use bazaar_core::user_store::{AdminUser, UserStore};
use bazaar_core::{Error, Result};
use bazaar_store_sqlite::SqliteStores;

struct Harness {
    tenants: Arc<dyn TenantStore>,
    users: Arc<dyn UserStore>,
    documents: Arc<dyn TenantDocumentStore>,
    provisioner: TenantProvisioner,
    resolver: TenantResolver,
}

async fn harness() -> Harness {
    let stores = SqliteStores::connect_in_memory().await.unwrap();
    let tenants: Arc<dyn TenantStore> = Arc::new(stores.tenants());
    let users: Arc<dyn UserStore> = Arc::new(stores.users());
    let documents: Arc<dyn TenantDocumentStore> = Arc::new(stores.documents());
    let provisioner = TenantProvisioner::new(tenants.clone(), users.clone(), documents.clone());
    let resolver = TenantResolver::new(tenants.clone());
    Harness {
        tenants,
        users,
        documents,
        provisioner,
        resolver,
    }
}

fn new_tenant(subdomain: &str, admin_email: &str) -> NewTenant {
    NewTenant {
        name: "Test Shop".to_string(),
        subdomain: subdomain.to_string(),
        custom_domain: None,
        plan: Some(TenantPlan::Growth),
        contact_email: "owner@example.com".to_string(),
        admin_email: admin_email.to_string(),
        admin_password: "a-long-password".to_string(),
    }
}

#[tokio::test]
async fn test_create_then_resolve_case_insensitive() {
    let h = harness().await;
    let created = h
        .provisioner
        .create_tenant(new_tenant("my-shop", "admin@my-shop.com"))
        .await
        .unwrap();

    for probe in ["my-shop", "MY-SHOP", "My-Shop"] {
        let resolved = h
            .resolver
            .resolve(&TenantIdentifier::parse(probe))
            .await
            .unwrap();
        assert_eq!(resolved.id, created.id);
        assert_eq!(resolved.subdomain, "my-shop");
    }

    // by id as well
    let resolved = h
        .resolver
        .resolve(&TenantIdentifier::parse(&created.id.to_string()))
        .await
        .unwrap();
    assert_eq!(resolved.id, created.id);
}

#[tokio::test]
async fn test_resolve_by_custom_domain() {
    let h = harness().await;
    let mut payload = new_tenant("acme", "admin@acme.com");
    payload.custom_domain = Some("shop.acme.com".to_string());
    let created = h.provisioner.create_tenant(payload).await.unwrap();

    let resolved = h
        .resolver
        .resolve(&TenantIdentifier::parse("shop.acme.com"))
        .await
        .unwrap();
    assert_eq!(resolved.id, created.id);
}

#[tokio::test]
async fn test_duplicate_subdomain_conflict_leaves_no_records() {
    let h = harness().await;
    h.provisioner
        .create_tenant(new_tenant("my-shop", "first@example.com"))
        .await
        .unwrap();

    let err = h
        .provisioner
        .create_tenant(new_tenant("MY-SHOP", "second@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // the losing attempt must not have bound its admin email
    assert!(h
        .users
        .find_by_email("second@example.com")
        .await
        .unwrap()
        .is_none());
    assert_eq!(h.tenants.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_reserved_and_invalid_subdomains_rejected() {
    let h = harness().await;
    for bad in ["api", "www", "admin"] {
        let err = h
            .provisioner
            .create_tenant(new_tenant(bad, "a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }), "{}", bad);
    }
    for bad in ["ab", "-abc", "abc-", "a_b_c"] {
        let err = h
            .provisioner
            .create_tenant(new_tenant(bad, "a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }), "{}", bad);
    }
    assert!(h.tenants.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_email_already_bound() {
    let h = harness().await;
    h.provisioner
        .create_tenant(new_tenant("shop-one", "admin@example.com"))
        .await
        .unwrap();

    let err = h
        .provisioner
        .create_tenant(new_tenant("shop-two", "admin@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(h.tenants.list().await.unwrap().len(), 1);
}

/// User store whose lookups never see existing rows, reproducing the
/// window where two provisions both pass the admin-email pre-check
/// before either admin row lands. Writes go to the real store, so the
/// unique email index still arbitrates.
struct LaggingUserStore {
    inner: Arc<dyn UserStore>,
}

#[async_trait::async_trait]
impl UserStore for LaggingUserStore {
    async fn insert_admin(&self, user: &AdminUser) -> Result<()> {
        self.inner.insert_admin(user).await
    }

    async fn find_by_email(&self, _email: &str) -> Result<Option<AdminUser>> {
        Ok(None)
    }

    async fn delete_all_for_tenant(&self, tenant_id: TenantId) -> Result<u64> {
        self.inner.delete_all_for_tenant(tenant_id).await
    }
}

#[tokio::test]
async fn test_failed_admin_insert_rolls_back_tenant() {
    let h = harness().await;
    h.provisioner
        .create_tenant(new_tenant("shop-one", "admin@example.com"))
        .await
        .unwrap();

    // same admin email, different subdomain, pre-check blinded: the
    // tenant row is inserted, then the admin insert hits the unique
    // email index
    let lagging: Arc<dyn UserStore> = Arc::new(LaggingUserStore {
        inner: h.users.clone(),
    });
    let racing = TenantProvisioner::new(h.tenants.clone(), lagging, h.documents.clone());
    let err = racing
        .create_tenant(new_tenant("shop-two", "admin@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // the losing tenant row did not survive the failed provision
    assert!(h
        .tenants
        .find_by_subdomain("shop-two")
        .await
        .unwrap()
        .is_none());
    assert_eq!(h.tenants.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_self_registration_forces_starter_trialing() {
    let h = harness().await;
    let provisioned = h
        .provisioner
        .register_tenant(SelfRegistration {
            name: "Trial Shop".to_string(),
            subdomain: "trial-shop".to_string(),
            contact_email: "owner@trial.com".to_string(),
            admin_email: "admin@trial.com".to_string(),
            admin_password: "a-long-password".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(provisioned.tenant.plan, TenantPlan::Starter);
    assert_eq!(provisioned.tenant.status, TenantStatus::Trialing);
    assert_eq!(
        provisioned.trial_ends_at - provisioned.tenant.created_at,
        chrono::Duration::days(14)
    );
}

#[tokio::test]
async fn test_provisioned_admin_user_has_hashed_credential() {
    let h = harness().await;
    let tenant = h
        .provisioner
        .create_tenant(new_tenant("my-shop", "admin@my-shop.com"))
        .await
        .unwrap();

    let admin = h
        .users
        .find_by_email("admin@my-shop.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(admin.tenant_id, tenant.id);
    assert!(admin.password_hash.starts_with("$argon2"));
    assert_ne!(admin.password_hash, "a-long-password");
}

#[tokio::test]
async fn test_delete_tenant_cascades_and_is_idempotent() {
    let h = harness().await;
    let tenant = h
        .provisioner
        .create_tenant(new_tenant("doomed", "admin@doomed.com"))
        .await
        .unwrap();

    h.documents
        .save(tenant.id, "products", &serde_json::json!([{"sku": "A"}]))
        .await
        .unwrap();
    h.documents
        .save(tenant.id, "website_config", &serde_json::json!({"theme": "dark"}))
        .await
        .unwrap();

    h.provisioner.delete_tenant(tenant.id).await.unwrap();
    // repeat call completes without error
    h.provisioner.delete_tenant(tenant.id).await.unwrap();

    assert!(h.tenants.find_by_id(tenant.id).await.unwrap().is_none());
    assert!(h.documents.list_keys(tenant.id).await.unwrap().is_empty());
    assert!(h
        .users
        .find_by_email("admin@doomed.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_status_state_machine() {
    let h = harness().await;
    let tenant = h
        .provisioner
        .register_tenant(SelfRegistration {
            name: "Trial Shop".to_string(),
            subdomain: "trial-shop".to_string(),
            contact_email: "owner@trial.com".to_string(),
            admin_email: "admin@trial.com".to_string(),
            admin_password: "a-long-password".to_string(),
        })
        .await
        .unwrap()
        .tenant;

    // trialing -> suspended -> active succeeds
    let t = h
        .provisioner
        .update_tenant_status(
            tenant.id,
            TenantStatus::Suspended,
            Some("ops@platform".to_string()),
            Some("fraud review".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(t.status, TenantStatus::Suspended);
    assert!(t.suspended.at.is_some());
    assert_eq!(t.suspended.reason.as_deref(), Some("fraud review"));

    let t = h
        .provisioner
        .update_tenant_status(tenant.id, TenantStatus::Active, None, None)
        .await
        .unwrap();
    assert_eq!(t.status, TenantStatus::Active);
    assert!(t.approved.at.is_some());

    // archived is terminal
    h.provisioner
        .update_tenant_status(tenant.id, TenantStatus::Archived, None, None)
        .await
        .unwrap();
    let err = h
        .provisioner
        .update_tenant_status(tenant.id, TenantStatus::Active, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_storefront_resolution_respects_status() {
    let h = harness().await;
    let tenant = h
        .provisioner
        .create_tenant(new_tenant("my-shop", "admin@my-shop.com"))
        .await
        .unwrap();
    let ident = TenantIdentifier::parse("my-shop");

    assert!(h.resolver.resolve_for_storefront(&ident).await.is_ok());

    h.provisioner
        .update_tenant_status(tenant.id, TenantStatus::Suspended, None, None)
        .await
        .unwrap();
    let err = h.resolver.resolve_for_storefront(&ident).await.unwrap_err();
    assert!(matches!(err, Error::TenantSuspended(_)));
    // admin-facing resolution still succeeds
    assert!(h.resolver.resolve(&ident).await.is_ok());

    h.provisioner
        .update_tenant_status(tenant.id, TenantStatus::Archived, None, None)
        .await
        .unwrap();
    let err = h.resolver.resolve_for_storefront(&ident).await.unwrap_err();
    assert!(matches!(err, Error::TenantArchived(_)));
    assert!(h.resolver.resolve(&ident).await.is_ok());
}

#[tokio::test]
async fn test_check_subdomain() {
    let h = harness().await;

    let reserved = h.provisioner.check_subdomain("api").await.unwrap();
    assert!(!reserved.available);
    assert_eq!(reserved.reason, Some(UnavailableReason::Reserved));

    let free = h.provisioner.check_subdomain("my-shop").await.unwrap();
    assert!(free.available);
    assert!(free.reason.is_none());

    let invalid = h.provisioner.check_subdomain("-x-").await.unwrap();
    assert!(!invalid.available);
    assert_eq!(invalid.reason, Some(UnavailableReason::Invalid));

    h.provisioner
        .create_tenant(new_tenant("my-shop", "admin@my-shop.com"))
        .await
        .unwrap();
    let taken = h.provisioner.check_subdomain("My-Shop").await.unwrap();
    assert!(!taken.available);
    assert_eq!(taken.reason, Some(UnavailableReason::Taken));
}

#[tokio::test]
async fn test_update_tenant_keeps_subdomain_immutable() {
    let h = harness().await;
    let tenant = h
        .provisioner
        .create_tenant(new_tenant("my-shop", "admin@my-shop.com"))
        .await
        .unwrap();

    let updated = h
        .provisioner
        .update_tenant(
            tenant.id,
            bazaar_core::provisioner::TenantUpdate {
                name: Some("Renamed Shop".to_string()),
                custom_domain: Some("shop.renamed.com".to_string()),
                branding: Some(serde_json::json!({"color": "#112233"})),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Renamed Shop");
    assert_eq!(updated.custom_domain.as_deref(), Some("shop.renamed.com"));
    assert_eq!(updated.subdomain, "my-shop");

    // the old subdomain still resolves
    assert!(h
        .resolver
        .resolve(&TenantIdentifier::parse("my-shop"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_custom_domain_uniqueness() {
    let h = harness().await;
    let mut first = new_tenant("shop-one", "one@example.com");
    first.custom_domain = Some("shop.example.com".to_string());
    h.provisioner.create_tenant(first).await.unwrap();

    let mut second = new_tenant("shop-two", "two@example.com");
    second.custom_domain = Some("shop.example.com".to_string());
    let err = h.provisioner.create_tenant(second).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}
