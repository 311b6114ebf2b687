//! Bazaar multi-tenant back-office server
//!
//! Serves tenant provisioning, resolution, the generic tenant document
//! store, and the ledger API from one process. Tenants are stored in a
//! SQLite database whose schema is migrated idempotently at startup.
//!
//! Usage:
//! ```bash
//! # With config file
//! bazaar-server --config config.yaml
//!
//! # Or with environment variables
//! BAZAAR_DATABASE_URL=sqlite:///var/lib/bazaar/bazaar.db bazaar-server
//! ```

use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use bazaar_server::config::ServerConfig;
use bazaar_server::routes::build_router;
use bazaar_server::state::AppState;

/// Bazaar Server - multi-tenant e-commerce back office
#[derive(Parser)]
#[command(name = "bazaar-server")]
#[command(about = "Bazaar multi-tenant back-office server", long_about = None)]
struct Cli {
    /// Path to configuration file (YAML or TOML)
    #[arg(short, long, value_name = "FILE", env = "BAZAAR_CONFIG")]
    config: Option<String>,

    /// SQLite database path or connection string (overrides config)
    #[arg(long, value_name = "DB", env = "BAZAAR_DATABASE_URL")]
    database: Option<String>,

    /// Listen port (overrides config)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load config from {}: {}", path, e))?,
        None => ServerConfig::default(),
    };
    config.merge_env();
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(database = %config.database, "opening database");
    let state = AppState::connect(&config.database).await?;
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "bazaar-server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
