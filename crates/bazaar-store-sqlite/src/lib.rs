//! SQLite-backed stores for Bazaar
//!
//! One shared pool feeds all four stores. `connect` runs the idempotent
//! startup migration (CREATE TABLE/INDEX IF NOT EXISTS), so the unique
//! indexes the core contracts rely on exist before any tenant takes
//! traffic.

mod document_store;
mod ledger_store;
mod tenant_store;
mod user_store;

pub use document_store::SqliteDocumentStore;
pub use ledger_store::SqliteLedgerStore;
pub use tenant_store::SqliteTenantStore;
pub use user_store::SqliteUserStore;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use bazaar_core::{Error, Result};

/// Shared SQLite connection pool plus store constructors.
#[derive(Clone)]
pub struct SqliteStores {
    pool: SqlitePool,
}

impl SqliteStores {
    /// Open (creating if missing) a file-backed database and run
    /// migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to open SQLite database: {}", e)))?;

        let stores = Self { pool };
        stores.run_migrations().await?;
        Ok(stores)
    }

    /// Open a connection-string URL (`sqlite:...`). Used by the server,
    /// which takes the database location from config.
    pub async fn connect_url(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| Error::Config(format!("Invalid database URL '{}': {}", url, e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to open SQLite database: {}", e)))?;

        let stores = Self { pool };
        stores.run_migrations().await?;
        Ok(stores)
    }

    /// In-memory database for tests. A single pooled connection that is
    /// never recycled, otherwise the database vanishes with it.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| Error::Database(e.to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to open in-memory database: {}", e)))?;

        let stores = Self { pool };
        stores.run_migrations().await?;
        Ok(stores)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn tenants(&self) -> SqliteTenantStore {
        SqliteTenantStore::new(self.pool.clone())
    }

    pub fn users(&self) -> SqliteUserStore {
        SqliteUserStore::new(self.pool.clone())
    }

    pub fn documents(&self) -> SqliteDocumentStore {
        SqliteDocumentStore::new(self.pool.clone())
    }

    pub fn ledger(&self) -> SqliteLedgerStore {
        SqliteLedgerStore::new(self.pool.clone())
    }

    /// Idempotent schema setup, run once per process start.
    async fn run_migrations(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS tenants (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                subdomain TEXT NOT NULL,
                custom_domain TEXT,
                status TEXT NOT NULL,
                plan TEXT NOT NULL,
                contact_email TEXT NOT NULL,
                admin_email TEXT NOT NULL,
                branding TEXT NOT NULL DEFAULT '{}',
                settings TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                approved_at TEXT,
                approved_actor TEXT,
                approved_reason TEXT,
                suspended_at TEXT,
                suspended_actor TEXT,
                suspended_reason TEXT,
                rejected_at TEXT,
                rejected_actor TEXT,
                rejected_reason TEXT
            )
            "#,
            // subdomain is stored lowercase; this index is the final
            // arbiter for concurrent creation
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_tenants_subdomain
            ON tenants(subdomain)
            "#,
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_tenants_custom_domain
            ON tenants(custom_domain) WHERE custom_domain IS NOT NULL
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS admin_users (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_admin_users_tenant
            ON admin_users(tenant_id)
            "#,
            // one document per (tenant, key) is the store's only
            // structural guarantee
            r#"
            CREATE TABLE IF NOT EXISTS tenant_documents (
                tenant_id TEXT NOT NULL,
                key TEXT NOT NULL,
                data TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (tenant_id, key)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS ledger_entities (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                phone TEXT NOT NULL UNIQUE,
                entity_type TEXT NOT NULL,
                total_owed_to_me INTEGER NOT NULL DEFAULT 0,
                total_i_owe_them INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS ledger_transactions (
                id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL,
                amount INTEGER NOT NULL,
                direction TEXT NOT NULL,
                status TEXT NOT NULL,
                transaction_date TEXT NOT NULL,
                due_date TEXT
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_ledger_transactions_entity
            ON ledger_transactions(entity_id)
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Database(format!("Migration failed: {}", e)))?;
        }

        info!("sqlite schema ready");
        Ok(())
    }
}

/// Map a sqlx error, turning unique-constraint violations into
/// `Error::Conflict` so callers can surface them as such.
pub(crate) fn map_sqlx_error(context: &str, e: sqlx::Error) -> Error {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return Error::Conflict(format!("{}: already exists", context));
        }
    }
    Error::Database(format!("{}: {}", context, e))
}

pub(crate) fn parse_datetime(raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| Error::Database(format!("Invalid timestamp '{}': {}", raw, e)))
}

pub(crate) fn parse_uuid(raw: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(raw).map_err(|e| Error::Database(format!("Invalid UUID '{}': {}", raw, e)))
}
