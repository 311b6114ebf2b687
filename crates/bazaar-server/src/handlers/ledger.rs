//! Ledger entity and transaction handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use bazaar_core::ledger::{
    EntityId, LedgerEntity, LedgerTransaction, NewEntity, NewTransaction, TransactionId,
    TransactionStatus,
};

use crate::error::ApiResult;
use crate::state::AppState;

/// `POST /ledger/entities`
pub async fn create_entity(
    State(state): State<AppState>,
    Json(payload): Json<NewEntity>,
) -> ApiResult<(StatusCode, Json<LedgerEntity>)> {
    let entity = state.ledger.create_entity(payload).await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

/// `GET /ledger/entities/{id}`
pub async fn get_entity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LedgerEntity>> {
    let entity = state.ledger.get_entity(EntityId(id)).await?;
    Ok(Json(entity))
}

/// `GET /ledger/entities/{id}/transactions`
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<LedgerTransaction>>> {
    // 404 for unknown entities rather than an empty list
    state.ledger.get_entity(EntityId(id)).await?;
    let transactions = state.ledger.list_transactions(EntityId(id)).await?;
    Ok(Json(transactions))
}

/// `POST /ledger/transactions`
pub async fn create_transaction(
    State(state): State<AppState>,
    Json(payload): Json<NewTransaction>,
) -> ApiResult<(StatusCode, Json<LedgerTransaction>)> {
    let txn = state.ledger.record(payload).await?;
    Ok((StatusCode::CREATED, Json(txn)))
}

#[derive(Debug, Deserialize)]
pub struct TransactionStatusUpdate {
    pub status: TransactionStatus,
}

/// `PATCH /ledger/transactions/{id}/status`
pub async fn update_transaction_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<TransactionStatusUpdate>,
) -> ApiResult<Json<LedgerTransaction>> {
    let txn = state
        .ledger
        .update_status(TransactionId(id), update.status)
        .await?;
    Ok(Json(txn))
}

/// `DELETE /ledger/transactions/{id}`
pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.ledger.remove(TransactionId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
