//! Shared application state

use std::sync::Arc;

use bazaar_core::document_store::TenantDocumentStore;
use bazaar_core::ledger::LedgerAggregator;
use bazaar_core::provisioner::TenantProvisioner;
use bazaar_core::resolver::TenantResolver;
use bazaar_core::Result;
use bazaar_store_sqlite::SqliteStores;

#[derive(Clone)]
pub struct AppState {
    pub provisioner: TenantProvisioner,
    pub resolver: TenantResolver,
    pub documents: Arc<dyn TenantDocumentStore>,
    pub ledger: LedgerAggregator,
}

impl AppState {
    pub fn from_stores(stores: &SqliteStores) -> Self {
        let tenants = Arc::new(stores.tenants());
        let users = Arc::new(stores.users());
        let documents: Arc<dyn TenantDocumentStore> = Arc::new(stores.documents());
        let ledger_store = Arc::new(stores.ledger());

        Self {
            provisioner: TenantProvisioner::new(tenants.clone(), users, documents.clone()),
            resolver: TenantResolver::new(tenants),
            documents,
            ledger: LedgerAggregator::new(ledger_store),
        }
    }

    /// Open the database named by the config and wire everything up.
    pub async fn connect(database: &str) -> Result<Self> {
        let url = if database.starts_with("sqlite:") {
            database.to_string()
        } else {
            format!("sqlite://{}", database)
        };
        let stores = SqliteStores::connect_url(&url).await?;
        Ok(Self::from_stores(&stores))
    }
}
