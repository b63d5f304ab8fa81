//! Admin HTTP handlers: account onboarding and top-up decisions.
//!
//! - POST /api/v1/admin/accounts - open a wallet for a new client
//! - POST /api/v1/admin/accounts/{id}/deactivate
//! - GET  /api/v1/admin/topups - pending review queue, oldest first
//! - POST /api/v1/admin/topups/{id}/approve - approve and credit
//! - POST /api/v1/admin/topups/{id}/reject

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ledger::WalletResponse;
use crate::models::topup::{ApproveTopUpRequest, RejectTopUpRequest, TopUpResponse};
use crate::state::AppState;

/// Open a wallet for a newly onboarded client. Balance starts at zero;
/// funds only ever arrive through approved top-up requests.
pub async fn create_account(State(state): State<AppState>) -> Json<WalletResponse> {
    let snapshot = state.ledger.open_account().await;
    Json(WalletResponse {
        account_id: snapshot.account_id,
        balance_bututs: snapshot.balance_bututs,
        is_active: snapshot.is_active,
    })
}

/// Deactivate a wallet. Entry history survives; accounts are never
/// deleted.
pub async fn deactivate_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<WalletResponse>, AppError> {
    state.ledger.deactivate_account(account_id).await?;
    let snapshot = state.ledger.snapshot(account_id).await?;
    Ok(Json(WalletResponse {
        account_id: snapshot.account_id,
        balance_bututs: snapshot.balance_bututs,
        is_active: snapshot.is_active,
    }))
}

/// Pending top-up requests, oldest first (the review queue).
pub async fn list_pending_topups(State(state): State<AppState>) -> Json<Vec<TopUpResponse>> {
    let topups = state.topups.list_pending().await;
    Json(topups.into_iter().map(Into::into).collect())
}

/// Approve a pending top-up request and credit the wallet.
///
/// Approval and the ledger credit are one atomic unit; retrying an
/// already-approved request returns 409 and never double-credits.
pub async fn approve_topup(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(request): Json<ApproveTopUpRequest>,
) -> Result<Json<TopUpResponse>, AppError> {
    let topup = state
        .topups
        .approve(request_id, request.approved_amount, request.admin_notes)
        .await?;
    Ok(Json(topup.into()))
}

/// Reject a pending top-up request. No ledger effect.
pub async fn reject_topup(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(request): Json<RejectTopUpRequest>,
) -> Result<Json<TopUpResponse>, AppError> {
    let topup = state
        .topups
        .reject(request_id, request.rejection_reason)
        .await?;
    Ok(Json(topup.into()))
}
