//! Route table

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{documents, ledger, tenants};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Tenant lifecycle
        .route("/tenants", post(tenants::create_tenant))
        .route("/tenants/register", post(tenants::register_tenant))
        .route(
            "/tenants/check-subdomain/{subdomain}",
            get(tenants::check_subdomain),
        )
        .route("/tenants/resolve/{subdomain}", get(tenants::resolve_tenant))
        .route("/tenants/{id}", get(tenants::get_tenant))
        .route("/tenants/{id}", put(tenants::update_tenant))
        .route("/tenants/{id}/status", patch(tenants::update_tenant_status))
        .route("/tenants/{id}", delete(tenants::delete_tenant))
        // Tenant-scoped documents
        .route("/tenants/{id}/data", get(documents::list_documents))
        .route("/tenants/{id}/data/{key}", get(documents::get_document))
        .route("/tenants/{id}/data/{key}", put(documents::put_document))
        .route(
            "/tenants/{id}/data/{key}",
            delete(documents::delete_document),
        )
        // Ledger
        .route("/ledger/entities", post(ledger::create_entity))
        .route("/ledger/entities/{id}", get(ledger::get_entity))
        .route(
            "/ledger/entities/{id}/transactions",
            get(ledger::list_transactions),
        )
        .route("/ledger/transactions", post(ledger::create_transaction))
        .route(
            "/ledger/transactions/{id}/status",
            patch(ledger::update_transaction_status),
        )
        .route(
            "/ledger/transactions/{id}",
            delete(ledger::delete_transaction),
        )
        // Operational
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
