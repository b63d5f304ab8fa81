//! Top-up funding request HTTP handlers (client side).
//!
//! - POST /api/v1/topups - submit a funding request
//! - POST /api/v1/topups/{id}/cancel - cancel while still pending
//! - GET  /api/v1/topups - list own requests
//!
//! Approval and rejection are admin actions and live under
//! `handlers::admin`.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::topup::{SubmitTopUpRequest, TopUpResponse};
use crate::state::AppState;

/// Submit a funding request.
///
/// # Request Body
///
/// ```json
/// {
///   "requested_amount": 50000,
///   "payment_method": "bank_transfer",
///   "payment_reference": "TRX-2024-0091",
///   "receipt_ref": "uploads/receipts/0091.jpg"
/// }
/// ```
///
/// Creates the request in `pending`; the wallet is only credited once an
/// admin approves it.
pub async fn submit_topup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<SubmitTopUpRequest>,
) -> Result<Json<TopUpResponse>, AppError> {
    let topup = state.topups.submit(auth.account_id, request).await?;
    Ok(Json(topup.into()))
}

/// Cancel a still-pending request. Only the owner may cancel; requests
/// in a terminal state return a conflict.
pub async fn cancel_topup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<TopUpResponse>, AppError> {
    let topup = state.topups.cancel(request_id, auth.account_id).await?;
    Ok(Json(topup.into()))
}

/// List the authenticated account's funding requests, newest first.
pub async fn list_topups(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<TopUpResponse>>, AppError> {
    let topups = state.topups.list_for_account(auth.account_id).await;
    Ok(Json(topups.into_iter().map(Into::into).collect()))
}
