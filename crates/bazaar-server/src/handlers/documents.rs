//! Tenant document handlers
//!
//! The store is key-agnostic: every feature routes its data through
//! these two operations. Handlers verify the tenant exists before
//! touching documents so no write can create data for a vanished
//! tenant.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use bazaar_core::resolver::TenantIdentifier;
use bazaar_core::tenant::TenantId;

use crate::error::ApiResult;
use crate::state::AppState;

async fn require_tenant(state: &AppState, id: Uuid) -> ApiResult<TenantId> {
    let tenant = state
        .resolver
        .resolve(&TenantIdentifier::Id(TenantId::from_uuid(id)))
        .await?;
    Ok(tenant.id)
}

/// `GET /tenants/{id}/data/{key}`: absence is `"data": null`, not 404.
pub async fn get_document(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
) -> ApiResult<Json<Value>> {
    let tenant_id = require_tenant(&state, id).await?;
    let data = state.documents.get(tenant_id, &key).await?;
    Ok(Json(json!({
        "key": key,
        "data": data,
    })))
}

/// `PUT /tenants/{id}/data/{key}`: full replacement upsert of the raw
/// JSON body. Last write wins.
pub async fn put_document(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
    Json(data): Json<Value>,
) -> ApiResult<StatusCode> {
    let tenant_id = require_tenant(&state, id).await?;
    state.documents.save(tenant_id, &key, &data).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /tenants/{id}/data`: list of configured keys.
pub async fn list_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let tenant_id = require_tenant(&state, id).await?;
    let keys = state.documents.list_keys(tenant_id).await?;
    Ok(Json(json!({ "keys": keys })))
}

/// `DELETE /tenants/{id}/data/{key}`: idempotent.
pub async fn delete_document(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
) -> ApiResult<StatusCode> {
    let tenant_id = require_tenant(&state, id).await?;
    state.documents.delete(tenant_id, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}
