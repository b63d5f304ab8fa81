//! Wallet HTTP handlers.
//!
//! - GET /api/v1/wallet - current balance for the authenticated account
//! - GET /api/v1/wallet/entries - that account's ledger entries

use axum::{Extension, Json, extract::State};

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::ledger::{LedgerEntryResponse, WalletResponse};
use crate::state::AppState;

/// Current balance and activity flag for the authenticated wallet.
pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<WalletResponse>, AppError> {
    let snapshot = state.ledger.snapshot(auth.account_id).await?;
    Ok(Json(WalletResponse {
        account_id: snapshot.account_id,
        balance_bututs: snapshot.balance_bututs,
        is_active: snapshot.is_active,
    }))
}

/// Ledger entries for the authenticated wallet, oldest first.
///
/// The balance is always reconstructable from this list alone.
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<LedgerEntryResponse>>, AppError> {
    let entries = state.ledger.entries(auth.account_id).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
