//! Purchase HTTP handlers.
//!
//! - POST /api/v1/purchases/airtime - buy airtime for a phone number
//! - POST /api/v1/purchases/cashpower - buy an electricity token
//! - POST /api/v1/purchases/{id}/complete - dispense outcome callback
//! - GET  /api/v1/purchases/{id} - fetch one purchase
//! - GET  /api/v1/purchases - filtered history

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::purchase::{
    AirtimePurchaseRequest, CashpowerPurchaseRequest, CompletePurchaseRequest, PurchaseQuery,
    PurchaseResponse,
};
use crate::state::AppState;

/// Initiate an airtime purchase.
///
/// The wallet is debited up front; the response carries the transaction
/// id the dispensing collaborator calls back on. Insufficient funds
/// surface as 422 and leave no trace.
pub async fn buy_airtime(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<AirtimePurchaseRequest>,
) -> Result<Json<PurchaseResponse>, AppError> {
    let txn = state
        .purchases
        .initiate_airtime(auth.account_id, request)
        .await?;
    Ok(Json(txn.into()))
}

/// Initiate a cashpower (prepaid electricity) purchase.
pub async fn buy_cashpower(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CashpowerPurchaseRequest>,
) -> Result<Json<PurchaseResponse>, AppError> {
    let txn = state
        .purchases
        .initiate_cashpower(auth.account_id, request)
        .await?;
    Ok(Json(txn.into()))
}

/// Record the dispense outcome for a pending purchase.
///
/// Allowed once; a second call returns 409 with the balance untouched.
/// Only the owning account (or an admin key) may complete a purchase.
pub async fn complete_purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<CompletePurchaseRequest>,
) -> Result<Json<PurchaseResponse>, AppError> {
    let txn = state.purchases.get(transaction_id).await?;
    // A foreign purchase is indistinguishable from a missing one.
    if txn.account_id != auth.account_id && !auth.is_admin {
        return Err(AppError::NotFound("purchase transaction"));
    }

    let txn = state
        .purchases
        .complete(transaction_id, request.outcome, request.error_message)
        .await?;
    Ok(Json(txn.into()))
}

/// Fetch one purchase belonging to the authenticated account.
pub async fn get_purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<PurchaseResponse>, AppError> {
    let txn = state.purchases.get(transaction_id).await?;
    if txn.account_id != auth.account_id && !auth.is_admin {
        return Err(AppError::NotFound("purchase transaction"));
    }
    Ok(Json(txn.into()))
}

/// Filtered purchase history for the authenticated account.
///
/// Query parameters: `status` (success|fail), `provider`, `start_date`,
/// `end_date` (must be after `start_date`), `limit` (1-500, default 50),
/// `offset` (>= 0).
pub async fn list_purchases(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<PurchaseQuery>,
) -> Result<Json<Vec<PurchaseResponse>>, AppError> {
    let txns = state.purchases.list(auth.account_id, query).await?;
    Ok(Json(txns.into_iter().map(Into::into).collect()))
}
