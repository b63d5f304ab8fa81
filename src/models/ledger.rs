//! Wallet ledger entry model.
//!
//! This module defines:
//! - `LedgerEntry`: immutable record of one balance-affecting event
//! - `EntryType`: credit or debit
//! - `LedgerEntryResponse`: response body returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Balance increase
    Credit,
    /// Balance decrease
    Debit,
}

/// Immutable record of one balance-affecting event on a wallet.
///
/// # Balance Storage
///
/// Amounts and balances are stored as `i64` bututs (GMD x 100) to avoid
/// floating-point precision issues. For example, GMD 10.50 is stored as
/// 1050 bututs.
///
/// # Invariants
///
/// - `amount_bututs > 0`
/// - `balance_after == balance_before + amount` for credits,
///   `balance_before - amount` for debits
/// - `balance_after >= 0` always
/// - entries for one account form an append-only chain: each entry's
///   `balance_before` equals the previous entry's `balance_after`
///
/// Entries are created exactly once per ledger-affecting operation and
/// never mutated or deleted. Reversals are new compensating entries.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry
    pub id: Uuid,

    /// Account whose balance this entry affects
    pub account_id: Uuid,

    /// Credit or debit
    pub entry_type: EntryType,

    /// Amount in bututs, always positive
    pub amount_bututs: i64,

    /// Materialized balance immediately before this entry applied
    pub balance_before: i64,

    /// Materialized balance immediately after this entry applied
    pub balance_after: i64,

    /// Human-readable description of the event
    pub description: String,

    /// Optional link to the top-up request or purchase transaction that
    /// caused this entry
    pub related_request_id: Option<Uuid>,

    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

/// Response body for ledger entry listings.
#[derive(Debug, Serialize)]
pub struct LedgerEntryResponse {
    pub id: Uuid,
    pub entry_type: EntryType,
    pub amount_bututs: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub description: String,
    pub related_request_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Convert a LedgerEntry to its API response form.
///
/// Drops `account_id`: entries are only ever listed within the
/// authenticated account's own wallet.
impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            entry_type: entry.entry_type,
            amount_bututs: entry.amount_bututs,
            balance_before: entry.balance_before,
            balance_after: entry.balance_after,
            description: entry.description,
            related_request_id: entry.related_request_id,
            created_at: entry.created_at,
        }
    }
}

/// Response body for the wallet balance endpoint.
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub account_id: Uuid,
    pub balance_bututs: i64,
    pub is_active: bool,
}
