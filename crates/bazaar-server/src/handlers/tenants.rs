//! Tenant lifecycle and resolution handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use bazaar_core::provisioner::{NewTenant, ProvisionedTenant, SelfRegistration, TenantUpdate};
use bazaar_core::resolver::TenantIdentifier;
use bazaar_core::tenant::{PublicTenant, SubdomainAvailability, Tenant, TenantId, TenantStatus};

use crate::error::ApiResult;
use crate::state::AppState;

/// `POST /tenants`: admin-created tenant.
pub async fn create_tenant(
    State(state): State<AppState>,
    Json(payload): Json<NewTenant>,
) -> ApiResult<(StatusCode, Json<Tenant>)> {
    let tenant = state.provisioner.create_tenant(payload).await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

/// `POST /tenants/register`: public self-registration. Starter plan,
/// trialing status; the response carries the computed trial end date.
pub async fn register_tenant(
    State(state): State<AppState>,
    Json(payload): Json<SelfRegistration>,
) -> ApiResult<(StatusCode, Json<ProvisionedTenant>)> {
    let provisioned = state.provisioner.register_tenant(payload).await?;
    Ok((StatusCode::CREATED, Json(provisioned)))
}

/// `GET /tenants/check-subdomain/{subdomain}`
pub async fn check_subdomain(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ApiResult<Json<SubdomainAvailability>> {
    let availability = state.provisioner.check_subdomain(&subdomain).await?;
    Ok(Json(availability))
}

/// `GET /tenants/resolve/{subdomain}`: storefront resolution, exposing
/// only public-safe fields. Suspended -> 503, archived -> 410.
pub async fn resolve_tenant(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ApiResult<Json<PublicTenant>> {
    let tenant = state
        .resolver
        .resolve_for_storefront(&TenantIdentifier::parse(&subdomain))
        .await?;
    Ok(Json(PublicTenant::from(&tenant)))
}

/// `GET /tenants/{id}`: admin view, any status resolves.
pub async fn get_tenant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Tenant>> {
    let tenant = state
        .resolver
        .resolve(&TenantIdentifier::Id(TenantId::from_uuid(id)))
        .await?;
    Ok(Json(tenant))
}

/// `PUT /tenants/{id}`
pub async fn update_tenant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<TenantUpdate>,
) -> ApiResult<Json<Tenant>> {
    let tenant = state
        .provisioner
        .update_tenant(TenantId::from_uuid(id), update)
        .await?;
    Ok(Json(tenant))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: TenantStatus,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// `PATCH /tenants/{id}/status`
pub async fn update_tenant_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Json<Tenant>> {
    let tenant = state
        .provisioner
        .update_tenant_status(
            TenantId::from_uuid(id),
            update.status,
            update.actor,
            update.reason,
        )
        .await?;
    Ok(Json(tenant))
}

/// `DELETE /tenants/{id}`: cascading, safely retryable.
pub async fn delete_tenant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .provisioner
        .delete_tenant(TenantId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
