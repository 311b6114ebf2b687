//! Document store contract tests: upsert semantics, absence handling,
//! last-write-wins, and the opt-in compare-and-swap path

use bazaar_core::document_store::{get_or, TenantDocumentStore};
use bazaar_core::tenant::TenantId;
use bazaar_store_sqlite::SqliteStores;
use serde_json::json;

async fn store() -> bazaar_store_sqlite::SqliteDocumentStore {
    SqliteStores::connect_in_memory().await.unwrap().documents()
}

#[tokio::test]
async fn test_save_get_roundtrip() {
    let store = store().await;
    let tenant = TenantId::new();

    let products = json!([
        {"sku": "tee-01", "name": "T-Shirt", "price": 1999},
        {"sku": "mug-02", "name": "Mug", "price": 899}
    ]);
    store.save(tenant, "products", &products).await.unwrap();

    let loaded = store.get(tenant, "products").await.unwrap().unwrap();
    assert_eq!(loaded, products);
}

#[tokio::test]
async fn test_absence_is_none_not_error() {
    let store = store().await;
    let tenant = TenantId::new();

    assert!(store.get(tenant, "website_config").await.unwrap().is_none());

    let fallback = json!({"theme": "default"});
    let value = get_or(&store, tenant, "website_config", fallback.clone())
        .await
        .unwrap();
    assert_eq!(value, fallback);
}

#[tokio::test]
async fn test_save_replaces_wholesale() {
    let store = store().await;
    let tenant = TenantId::new();

    store
        .save(tenant, "inventory_settings", &json!({"low": 5, "critical": 1}))
        .await
        .unwrap();
    // a second save replaces the whole value, no merging
    store
        .save(tenant, "inventory_settings", &json!({"low": 10}))
        .await
        .unwrap();

    let loaded = store
        .get(tenant, "inventory_settings")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, json!({"low": 10}));
    assert!(loaded.get("critical").is_none());
}

#[tokio::test]
async fn test_scalar_and_array_documents() {
    // the store is shape-agnostic: scalars and arrays are valid documents
    let store = store().await;
    let tenant = TenantId::new();

    store.save(tenant, "maintenance", &json!(true)).await.unwrap();
    store
        .save(tenant, "carousel", &json!(["a.png", "b.png"]))
        .await
        .unwrap();

    assert_eq!(store.get(tenant, "maintenance").await.unwrap().unwrap(), json!(true));
    assert_eq!(
        store.get(tenant, "carousel").await.unwrap().unwrap(),
        json!(["a.png", "b.png"])
    );
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let store = store().await;
    let tenant_a = TenantId::new();
    let tenant_b = TenantId::new();

    store.save(tenant_a, "products", &json!(["a"])).await.unwrap();
    store.save(tenant_b, "products", &json!(["b"])).await.unwrap();

    assert_eq!(store.get(tenant_a, "products").await.unwrap().unwrap(), json!(["a"]));
    assert_eq!(store.get(tenant_b, "products").await.unwrap().unwrap(), json!(["b"]));
}

#[tokio::test]
async fn test_concurrent_saves_leave_exactly_one_document() {
    let stores = SqliteStores::connect_in_memory().await.unwrap();
    let store_a = stores.documents();
    let store_b = stores.documents();
    let tenant = TenantId::new();

    let a = json!({"winner": "a", "items": [1, 2, 3]});
    let b = json!({"winner": "b"});

    let (ra, rb) = tokio::join!(
        store_a.save(tenant, "k", &a),
        store_b.save(tenant, "k", &b),
    );
    ra.unwrap();
    rb.unwrap();

    // exactly one of A or B, never a merge, never two rows
    let stored = store_a.get(tenant, "k").await.unwrap().unwrap();
    assert!(stored == a || stored == b, "unexpected merge: {}", stored);
    assert_eq!(store_a.list_keys(tenant).await.unwrap(), vec!["k"]);
}

#[tokio::test]
async fn test_cas_rejects_stale_version() {
    let store = store().await;
    let tenant = TenantId::new();

    // create-if-absent
    assert!(store
        .save_if_version(tenant, "cfg", &json!({"v": 1}), 0)
        .await
        .unwrap());
    // second create attempt loses
    assert!(!store
        .save_if_version(tenant, "cfg", &json!({"v": 99}), 0)
        .await
        .unwrap());

    let (value, version) = store.get_with_version(tenant, "cfg").await.unwrap().unwrap();
    assert_eq!(value, json!({"v": 1}));
    assert_eq!(version, 1);

    // stale writer rejected, current writer accepted
    assert!(!store
        .save_if_version(tenant, "cfg", &json!({"v": 2}), 7)
        .await
        .unwrap());
    assert!(store
        .save_if_version(tenant, "cfg", &json!({"v": 2}), version)
        .await
        .unwrap());

    let (value, version) = store.get_with_version(tenant, "cfg").await.unwrap().unwrap();
    assert_eq!(value, json!({"v": 2}));
    assert_eq!(version, 2);
}

#[tokio::test]
async fn test_plain_save_ignores_versions() {
    let store = store().await;
    let tenant = TenantId::new();

    store.save(tenant, "cfg", &json!({"v": 1})).await.unwrap();
    store.save(tenant, "cfg", &json!({"v": 2})).await.unwrap();
    store.save(tenant, "cfg", &json!({"v": 3})).await.unwrap();

    let (value, version) = store.get_with_version(tenant, "cfg").await.unwrap().unwrap();
    assert_eq!(value, json!({"v": 3}));
    assert_eq!(version, 3);
}

#[tokio::test]
async fn test_delete_and_delete_all_idempotent() {
    let store = store().await;
    let tenant = TenantId::new();

    store.save(tenant, "products", &json!([])).await.unwrap();
    store.save(tenant, "website_config", &json!({})).await.unwrap();

    assert!(store.delete(tenant, "products").await.unwrap());
    assert!(!store.delete(tenant, "products").await.unwrap());

    assert_eq!(store.delete_all(tenant).await.unwrap(), 1);
    assert_eq!(store.delete_all(tenant).await.unwrap(), 0);
    assert!(store.list_keys(tenant).await.unwrap().is_empty());
}
