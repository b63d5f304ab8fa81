//! Purchase transaction recording.
//!
//! A purchase debits the wallet up front, then waits for the external
//! dispensing collaborator to report success or fail. A failed dispense
//! is compensated with an ordinary credit for the same amount; the
//! original debit entry is never touched.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::purchase::{
    AirtimePurchaseRequest, CashpowerPurchaseRequest, NetworkCode, PurchaseOutcome, PurchaseQuery,
    PurchaseStatus, PurchaseTransaction, PurchaseType,
};
use crate::services::phone;
use crate::services::wallet_ledger::WalletLedger;

/// Purchase amounts accepted from clients: GMD 5-1000 inclusive.
///
/// Top-up funding requests have no such cap; the asymmetry is inherited
/// from the portal's validation rules and is preserved here.
pub const MIN_PURCHASE_BUTUTS: i64 = 500;
pub const MAX_PURCHASE_BUTUTS: i64 = 100_000;

const DEFAULT_QUERY_LIMIT: i64 = 50;
const MAX_QUERY_LIMIT: i64 = 500;

/// Records wallet-funded purchases and their outcomes.
pub struct PurchaseService {
    ledger: Arc<WalletLedger>,
    transactions: RwLock<HashMap<Uuid, Arc<Mutex<PurchaseTransaction>>>>,
}

impl PurchaseService {
    pub fn new(ledger: Arc<WalletLedger>) -> Self {
        Self {
            ledger,
            transactions: RwLock::new(HashMap::new()),
        }
    }

    /// Initiate an airtime purchase.
    ///
    /// Resolves the carrier from the phone number, debits the wallet, and
    /// records a `pending` transaction for the dispensing collaborator.
    /// On `InsufficientFunds` no transaction is created. The returned id
    /// is the collaborator's callback handle.
    pub async fn initiate_airtime(
        &self,
        account_id: Uuid,
        request: AirtimePurchaseRequest,
    ) -> Result<PurchaseTransaction, AppError> {
        validate_purchase_amount(request.amount_bututs)?;

        let resolved = phone::resolve(&request.phone_number)
            .map_err(|e| AppError::Validation(format!("phone_number: {e}")))?;

        // A declared provider must agree with the derived network; the
        // system never routes on a guess.
        if let Some(ref provider) = request.provider {
            let declared = NetworkCode::from_provider_name(provider).ok_or_else(|| {
                AppError::Validation(format!("provider: unknown provider '{provider}'"))
            })?;
            if declared != resolved.network_code {
                return Err(AppError::Validation(format!(
                    "provider: {} does not serve {}",
                    declared.as_str(),
                    resolved.normalized
                )));
            }
        }

        self.initiate(
            account_id,
            PurchaseType::Airtime,
            resolved.normalized,
            Some(resolved.network_code),
            request.amount_bututs,
        )
        .await
    }

    /// Initiate a cashpower (prepaid electricity) purchase.
    pub async fn initiate_cashpower(
        &self,
        account_id: Uuid,
        request: CashpowerPurchaseRequest,
    ) -> Result<PurchaseTransaction, AppError> {
        validate_purchase_amount(request.amount_bututs)?;

        let meter = request.meter_number.trim();
        if meter.is_empty() || !meter.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Validation(
                "meter_number: must be a numeric meter number".to_string(),
            ));
        }

        self.initiate(
            account_id,
            PurchaseType::Cashpower,
            meter.to_string(),
            None,
            request.amount_bututs,
        )
        .await
    }

    async fn initiate(
        &self,
        account_id: Uuid,
        purchase_type: PurchaseType,
        destination: String,
        network_code: Option<NetworkCode>,
        amount_bututs: i64,
    ) -> Result<PurchaseTransaction, AppError> {
        let transaction_id = Uuid::new_v4();

        // Provisional debit; InsufficientFunds surfaces here and the
        // transaction is never created.
        let debit = self
            .ledger
            .debit(
                account_id,
                amount_bututs,
                &format!("{purchase_type:?} purchase to {destination}").to_lowercase(),
                Some(transaction_id),
            )
            .await?;

        let transaction = PurchaseTransaction {
            id: transaction_id,
            account_id,
            purchase_type,
            destination,
            network_code,
            amount_bututs,
            status: PurchaseStatus::Pending,
            error_message: None,
            debit_entry_id: debit.id,
            created_at: Utc::now(),
        };

        self.transactions
            .write()
            .await
            .insert(transaction_id, Arc::new(Mutex::new(transaction.clone())));

        tracing::info!(
            %transaction_id,
            %account_id,
            ?purchase_type,
            amount_bututs,
            "purchase initiated, awaiting dispense outcome"
        );
        Ok(transaction)
    }

    /// Record the dispensing collaborator's outcome.
    ///
    /// Allowed exactly once per transaction; later calls fail with
    /// `StateConflict` and leave the balance untouched. A `fail` outcome
    /// reverses the up-front debit with a compensating credit before the
    /// status flips.
    pub async fn complete(
        &self,
        transaction_id: Uuid,
        outcome: PurchaseOutcome,
        error_message: Option<String>,
    ) -> Result<PurchaseTransaction, AppError> {
        let transaction = self.transaction(transaction_id).await?;
        let mut txn = transaction.lock().await;

        if txn.status != PurchaseStatus::Pending {
            return Err(AppError::StateConflict(format!(
                "purchase already completed as {:?}",
                txn.status
            )));
        }

        match outcome {
            PurchaseOutcome::Success => {
                txn.status = PurchaseStatus::Success;
                tracing::info!(%transaction_id, "purchase dispensed successfully");
            }
            PurchaseOutcome::Fail => {
                // Refund first; the transaction stays pending (and
                // retryable) if the compensating credit cannot be written.
                self.ledger
                    .credit(
                        txn.account_id,
                        txn.amount_bututs,
                        &format!("reversal of failed purchase {transaction_id}"),
                        Some(transaction_id),
                    )
                    .await?;
                txn.status = PurchaseStatus::Fail;
                txn.error_message = error_message;
                tracing::warn!(
                    %transaction_id,
                    error = txn.error_message.as_deref().unwrap_or("unspecified"),
                    "purchase failed, debit reversed"
                );
            }
        }

        Ok(txn.clone())
    }

    /// Fetch one transaction.
    pub async fn get(&self, transaction_id: Uuid) -> Result<PurchaseTransaction, AppError> {
        let transaction = self.transaction(transaction_id).await?;
        let txn = transaction.lock().await;
        Ok(txn.clone())
    }

    /// Filtered purchase history for one account, newest first.
    pub async fn list(
        &self,
        account_id: Uuid,
        query: PurchaseQuery,
    ) -> Result<Vec<PurchaseTransaction>, AppError> {
        let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        if !(1..=MAX_QUERY_LIMIT).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit: must be between 1 and {MAX_QUERY_LIMIT}"
            )));
        }
        let offset = query.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::Validation("offset: must not be negative".to_string()));
        }
        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if end <= start {
                return Err(AppError::Validation(
                    "end_date: must be after start_date".to_string(),
                ));
            }
        }
        let provider = match query.provider.as_deref() {
            Some(name) => Some(NetworkCode::from_provider_name(name).ok_or_else(|| {
                AppError::Validation(format!("provider: unknown provider '{name}'"))
            })?),
            None => None,
        };

        let mut out = Vec::new();
        for transaction in self.transactions.read().await.values() {
            let txn = transaction.lock().await;
            if txn.account_id != account_id {
                continue;
            }
            if let Some(status) = query.status {
                if txn.status != status {
                    continue;
                }
            }
            if let Some(network) = provider {
                if txn.network_code != Some(network) {
                    continue;
                }
            }
            if let Some(start) = query.start_date {
                if txn.created_at < start {
                    continue;
                }
            }
            if let Some(end) = query.end_date {
                if txn.created_at > end {
                    continue;
                }
            }
            out.push(txn.clone());
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<Arc<Mutex<PurchaseTransaction>>, AppError> {
        self.transactions
            .read()
            .await
            .get(&transaction_id)
            .cloned()
            .ok_or(AppError::NotFound("purchase transaction"))
    }
}

fn validate_purchase_amount(amount_bututs: i64) -> Result<(), AppError> {
    if !(MIN_PURCHASE_BUTUTS..=MAX_PURCHASE_BUTUTS).contains(&amount_bututs) {
        return Err(AppError::Validation(format!(
            "amount_bututs: must be between {MIN_PURCHASE_BUTUTS} and {MAX_PURCHASE_BUTUTS} (GMD 5-1000)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ledger::EntryType;

    fn airtime(phone: &str, amount: i64) -> AirtimePurchaseRequest {
        AirtimePurchaseRequest {
            phone_number: phone.to_string(),
            provider: None,
            amount_bututs: amount,
        }
    }

    async fn service_with_funds(initial: i64) -> (PurchaseService, Arc<WalletLedger>, Uuid) {
        let ledger = Arc::new(WalletLedger::new());
        let account_id = ledger.open_account().await.account_id;
        if initial > 0 {
            ledger.credit(account_id, initial, "seed", None).await.unwrap();
        }
        (PurchaseService::new(ledger.clone()), ledger, account_id)
    }

    #[tokio::test]
    async fn airtime_purchase_debits_and_records_pending() {
        let (service, ledger, account_id) = service_with_funds(10_000).await;
        let txn = service
            .initiate_airtime(account_id, airtime("+2203123456", 2_000))
            .await
            .unwrap();

        assert_eq!(txn.status, PurchaseStatus::Pending);
        assert_eq!(txn.destination, "2203123456");
        assert_eq!(txn.network_code, Some(NetworkCode::QcellGm));
        assert_eq!(ledger.snapshot(account_id).await.unwrap().balance_bututs, 8_000);

        let entries = ledger.entries(account_id).await.unwrap();
        assert_eq!(entries.last().unwrap().related_request_id, Some(txn.id));
    }

    #[tokio::test]
    async fn insufficient_funds_creates_no_transaction() {
        let (service, ledger, account_id) = service_with_funds(1_000).await;
        let err = service
            .initiate_airtime(account_id, airtime("2203123456", 2_000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds));

        assert!(service.list(account_id, PurchaseQuery::default()).await.unwrap().is_empty());
        // Only the seed credit exists.
        assert_eq!(ledger.entries(account_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_dispense_is_refunded_once() {
        let (service, ledger, account_id) = service_with_funds(5_000).await;
        let txn = service
            .initiate_airtime(account_id, airtime("6123456", 3_000))
            .await
            .unwrap();

        let failed = service
            .complete(txn.id, PurchaseOutcome::Fail, Some("carrier timeout".to_string()))
            .await
            .unwrap();
        assert_eq!(failed.status, PurchaseStatus::Fail);
        assert_eq!(failed.error_message.as_deref(), Some("carrier timeout"));

        // Debit reversed by a new compensating credit; nothing mutated.
        let entries = ledger.entries(account_id).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].entry_type, EntryType::Credit);
        assert_eq!(ledger.snapshot(account_id).await.unwrap().balance_bututs, 5_000);

        // Second completion is a no-op conflict, balance unaffected.
        let err = service
            .complete(txn.id, PurchaseOutcome::Fail, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StateConflict(_)));
        assert_eq!(ledger.snapshot(account_id).await.unwrap().balance_bututs, 5_000);
        assert_eq!(ledger.entries(account_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn successful_dispense_keeps_the_debit() {
        let (service, ledger, account_id) = service_with_funds(5_000).await;
        let txn = service
            .initiate_airtime(account_id, airtime("2209123456", 500))
            .await
            .unwrap();

        let done = service
            .complete(txn.id, PurchaseOutcome::Success, None)
            .await
            .unwrap();
        assert_eq!(done.status, PurchaseStatus::Success);
        assert_eq!(ledger.snapshot(account_id).await.unwrap().balance_bututs, 4_500);

        assert!(matches!(
            service.complete(txn.id, PurchaseOutcome::Success, None).await,
            Err(AppError::StateConflict(_))
        ));
    }

    #[tokio::test]
    async fn amounts_outside_gmd_5_to_1000_are_rejected() {
        let (service, _ledger, account_id) = service_with_funds(500_000).await;
        for amount in [499, 100_001, 0, -5] {
            assert!(matches!(
                service
                    .initiate_airtime(account_id, airtime("2203123456", amount))
                    .await,
                Err(AppError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn declared_provider_must_match_the_number() {
        let (service, _ledger, account_id) = service_with_funds(10_000).await;

        let mut request = airtime("2203123456", 1_000);
        request.provider = Some("Africell".to_string());
        assert!(matches!(
            service.initiate_airtime(account_id, request).await,
            Err(AppError::Validation(_))
        ));

        let mut request = airtime("2203123456", 1_000);
        request.provider = Some("QCell".to_string());
        assert!(service.initiate_airtime(account_id, request).await.is_ok());
    }

    #[tokio::test]
    async fn cashpower_requires_a_numeric_meter() {
        let (service, _ledger, account_id) = service_with_funds(10_000).await;
        let bad = CashpowerPurchaseRequest {
            meter_number: "meter-9".to_string(),
            amount_bututs: 1_000,
        };
        assert!(matches!(
            service.initiate_cashpower(account_id, bad).await,
            Err(AppError::Validation(_))
        ));

        let ok = CashpowerPurchaseRequest {
            meter_number: "00412345678".to_string(),
            amount_bututs: 1_000,
        };
        let txn = service.initiate_cashpower(account_id, ok).await.unwrap();
        assert_eq!(txn.purchase_type, PurchaseType::Cashpower);
        assert_eq!(txn.network_code, None);
    }

    #[tokio::test]
    async fn history_filters_compose() {
        let (service, _ledger, account_id) = service_with_funds(100_000).await;

        let qcell = service
            .initiate_airtime(account_id, airtime("2203123456", 1_000))
            .await
            .unwrap();
        let africell = service
            .initiate_airtime(account_id, airtime("2207123456", 1_000))
            .await
            .unwrap();
        service
            .complete(qcell.id, PurchaseOutcome::Success, None)
            .await
            .unwrap();
        service
            .complete(africell.id, PurchaseOutcome::Fail, Some("down".to_string()))
            .await
            .unwrap();

        let failed = service
            .list(
                account_id,
                PurchaseQuery {
                    status: Some(PurchaseStatus::Fail),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, africell.id);

        let qcell_only = service
            .list(
                account_id,
                PurchaseQuery {
                    provider: Some("qcell".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(qcell_only.len(), 1);
        assert_eq!(qcell_only[0].id, qcell.id);

        // Invalid paging and date ranges are rejected.
        assert!(matches!(
            service
                .list(
                    account_id,
                    PurchaseQuery {
                        limit: Some(0),
                        ..Default::default()
                    }
                )
                .await,
            Err(AppError::Validation(_))
        ));
        let now = Utc::now();
        assert!(matches!(
            service
                .list(
                    account_id,
                    PurchaseQuery {
                        start_date: Some(now),
                        end_date: Some(now),
                        ..Default::default()
                    }
                )
                .await,
            Err(AppError::Validation(_))
        ));
    }
}
