//! Wallet ledger - append-only balance-affecting entries per account.
//!
//! The entry log is the source of truth; the materialized balance is
//! derived state kept in step with the log inside the same critical
//! section. Reversals are ordinary compensating entries, never mutations.
//!
//! # Concurrency
//!
//! All ledger-affecting operations on one account are serialized by a
//! per-account `tokio::sync::Mutex` held across the whole
//! read-validate-write unit, so two concurrent debits can never both
//! observe the same pre-debit balance. Operations on different accounts
//! proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ledger::{EntryType, LedgerEntry};

/// Mutable state of one wallet, guarded by its per-account mutex.
#[derive(Debug)]
struct AccountState {
    balance_bututs: i64,
    is_active: bool,
    entries: Vec<LedgerEntry>,
}

/// Point-in-time snapshot of a wallet.
#[derive(Debug, Clone)]
pub struct WalletSnapshot {
    pub account_id: Uuid,
    pub balance_bututs: i64,
    pub is_active: bool,
}

/// The wallet ledger for all accounts.
///
/// The outer `RwLock` only guards the account registry; balance reads and
/// writes go through each account's own mutex, so unrelated accounts
/// never wait on one another.
#[derive(Debug, Default)]
pub struct WalletLedger {
    accounts: RwLock<HashMap<Uuid, Arc<Mutex<AccountState>>>>,
}

impl WalletLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a wallet for a newly onboarded client. Balance starts at zero.
    pub async fn open_account(&self) -> WalletSnapshot {
        let account_id = Uuid::new_v4();
        let state = AccountState {
            balance_bututs: 0,
            is_active: true,
            entries: Vec::new(),
        };
        self.accounts
            .write()
            .await
            .insert(account_id, Arc::new(Mutex::new(state)));
        tracing::info!(%account_id, "wallet opened");
        WalletSnapshot {
            account_id,
            balance_bututs: 0,
            is_active: true,
        }
    }

    /// Deactivate a wallet. The entry history survives; accounts are
    /// never deleted.
    pub async fn deactivate_account(&self, account_id: Uuid) -> Result<(), AppError> {
        let account = self.account(account_id).await?;
        let mut state = account.lock().await;
        state.is_active = false;
        tracing::info!(%account_id, "wallet deactivated");
        Ok(())
    }

    /// Current balance and activity flag.
    pub async fn snapshot(&self, account_id: Uuid) -> Result<WalletSnapshot, AppError> {
        let account = self.account(account_id).await?;
        let state = account.lock().await;
        Ok(WalletSnapshot {
            account_id,
            balance_bututs: state.balance_bututs,
            is_active: state.is_active,
        })
    }

    /// All entries for an account, oldest first.
    pub async fn entries(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>, AppError> {
        let account = self.account(account_id).await?;
        let state = account.lock().await;
        Ok(state.entries.clone())
    }

    /// Credit an account. Never fails on funds, only on an invalid amount
    /// or an inactive/unknown account.
    pub async fn credit(
        &self,
        account_id: Uuid,
        amount_bututs: i64,
        description: &str,
        related_request_id: Option<Uuid>,
    ) -> Result<LedgerEntry, AppError> {
        self.apply(
            account_id,
            EntryType::Credit,
            amount_bututs,
            description,
            related_request_id,
        )
        .await
    }

    /// Debit an account. Fails atomically with `InsufficientFunds` when
    /// the balance cannot cover the amount; no entry is written in that
    /// case.
    pub async fn debit(
        &self,
        account_id: Uuid,
        amount_bututs: i64,
        description: &str,
        related_request_id: Option<Uuid>,
    ) -> Result<LedgerEntry, AppError> {
        self.apply(
            account_id,
            EntryType::Debit,
            amount_bututs,
            description,
            related_request_id,
        )
        .await
    }

    /// The atomic unit: read balance, validate, write entry, update the
    /// materialized balance. Runs entirely under the account's mutex.
    async fn apply(
        &self,
        account_id: Uuid,
        entry_type: EntryType,
        amount_bututs: i64,
        description: &str,
        related_request_id: Option<Uuid>,
    ) -> Result<LedgerEntry, AppError> {
        if amount_bututs <= 0 {
            return Err(AppError::Validation("amount must be positive".to_string()));
        }

        let account = self.account(account_id).await?;
        let mut state = account.lock().await;

        if !state.is_active {
            return Err(AppError::AccountInactive);
        }

        let balance_before = state.balance_bututs;
        let balance_after = match entry_type {
            EntryType::Credit => balance_before
                .checked_add(amount_bututs)
                .ok_or_else(|| AppError::Internal("balance overflow".to_string()))?,
            EntryType::Debit => {
                if balance_before < amount_bututs {
                    return Err(AppError::InsufficientFunds);
                }
                balance_before - amount_bututs
            }
        };

        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            account_id,
            entry_type,
            amount_bututs,
            balance_before,
            balance_after,
            description: description.to_string(),
            related_request_id,
            created_at: Utc::now(),
        };

        // Entry append and balance update commit together; the lock is
        // still held, so no other operation can observe one without the
        // other.
        state.entries.push(entry.clone());
        state.balance_bututs = balance_after;

        tracing::debug!(
            %account_id,
            entry_id = %entry.id,
            ?entry_type,
            amount_bututs,
            balance_after,
            "ledger entry written"
        );

        Ok(entry)
    }

    async fn account(&self, account_id: Uuid) -> Result<Arc<Mutex<AccountState>>, AppError> {
        self.accounts
            .read()
            .await
            .get(&account_id)
            .cloned()
            .ok_or(AppError::NotFound("account"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn funded_ledger(initial: i64) -> (WalletLedger, Uuid) {
        let ledger = WalletLedger::new();
        let account_id = ledger.open_account().await.account_id;
        if initial > 0 {
            ledger
                .credit(account_id, initial, "seed", None)
                .await
                .unwrap();
        }
        (ledger, account_id)
    }

    #[tokio::test]
    async fn credit_then_debit_updates_balance_and_chains_entries() {
        let (ledger, account_id) = funded_ledger(10_000).await;
        ledger
            .debit(account_id, 2_500, "airtime purchase", None)
            .await
            .unwrap();
        ledger.credit(account_id, 500, "refund", None).await.unwrap();

        let snapshot = ledger.snapshot(account_id).await.unwrap();
        assert_eq!(snapshot.balance_bututs, 8_000);

        let entries = ledger.entries(account_id).await.unwrap();
        assert_eq!(entries.len(), 3);
        for pair in entries.windows(2) {
            assert_eq!(pair[0].balance_after, pair[1].balance_before);
        }
    }

    #[tokio::test]
    async fn balance_is_reconstructable_from_entries_alone() {
        let (ledger, account_id) = funded_ledger(50_000).await;
        for i in 1..=10 {
            ledger
                .debit(account_id, i * 100, "purchase", None)
                .await
                .unwrap();
        }
        ledger
            .credit(account_id, 700, "reversal", None)
            .await
            .unwrap();

        let entries = ledger.entries(account_id).await.unwrap();
        let reconstructed: i64 = entries
            .iter()
            .map(|e| match e.entry_type {
                EntryType::Credit => e.amount_bututs,
                EntryType::Debit => -e.amount_bututs,
            })
            .sum();
        let snapshot = ledger.snapshot(account_id).await.unwrap();
        assert_eq!(reconstructed, snapshot.balance_bututs);
    }

    #[tokio::test]
    async fn overdraft_fails_and_writes_no_entry() {
        let (ledger, account_id) = funded_ledger(1_000).await;
        let err = ledger
            .debit(account_id, 1_001, "too much", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds));

        let entries = ledger.entries(account_id).await.unwrap();
        assert_eq!(entries.len(), 1); // only the seed credit
        assert_eq!(ledger.snapshot(account_id).await.unwrap().balance_bututs, 1_000);
    }

    #[tokio::test]
    async fn zero_and_negative_amounts_are_rejected() {
        let (ledger, account_id) = funded_ledger(1_000).await;
        for amount in [0, -5] {
            assert!(matches!(
                ledger.credit(account_id, amount, "bad", None).await,
                Err(AppError::Validation(_))
            ));
            assert!(matches!(
                ledger.debit(account_id, amount, "bad", None).await,
                Err(AppError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn concurrent_debits_never_double_spend() {
        let (ledger, account_id) = funded_ledger(1_000).await;
        let ledger = Arc::new(ledger);

        // Funds cover exactly one of the two debits.
        let a = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.debit(account_id, 1_000, "a", None).await }
        });
        let b = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.debit(account_id, 1_000, "b", None).await }
        });

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert_eq!(ledger.snapshot(account_id).await.unwrap().balance_bututs, 0);
    }

    #[tokio::test]
    async fn deactivated_account_rejects_operations_but_keeps_history() {
        let (ledger, account_id) = funded_ledger(1_000).await;
        ledger.deactivate_account(account_id).await.unwrap();

        assert!(matches!(
            ledger.credit(account_id, 100, "late", None).await,
            Err(AppError::AccountInactive)
        ));
        assert_eq!(ledger.entries(account_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let ledger = WalletLedger::new();
        assert!(matches!(
            ledger.credit(Uuid::new_v4(), 100, "ghost", None).await,
            Err(AppError::NotFound("account"))
        ));
    }
}
