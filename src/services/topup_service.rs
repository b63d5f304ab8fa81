//! Top-up request state machine.
//!
//! Customer-submitted wallet funding requests: `pending` until an admin
//! approves or rejects them, or the owning client cancels. Approval is
//! the only transition with a ledger effect, and it must post exactly one
//! credit no matter how often or how concurrently it is retried.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::topup::{SubmitTopUpRequest, TopUpRequest, TopUpStatus};
use crate::services::wallet_ledger::WalletLedger;

/// The top-up request registry and its transitions.
///
/// Each request sits behind its own mutex; a transition holds that mutex
/// across the status check, the ledger credit and the status write, so
/// two racing approvals resolve to exactly one credit and one
/// `StateConflict`.
pub struct TopUpService {
    ledger: Arc<WalletLedger>,
    requests: RwLock<HashMap<Uuid, Arc<Mutex<TopUpRequest>>>>,
}

impl TopUpService {
    pub fn new(ledger: Arc<WalletLedger>) -> Self {
        Self {
            ledger,
            requests: RwLock::new(HashMap::new()),
        }
    }

    /// Create a `pending` funding request. No ledger effect.
    ///
    /// `requested_amount` must be positive; it is deliberately not capped
    /// the way purchase amounts are.
    pub async fn submit(
        &self,
        account_id: Uuid,
        request: SubmitTopUpRequest,
    ) -> Result<TopUpRequest, AppError> {
        if request.requested_amount <= 0 {
            return Err(AppError::Validation(
                "requested_amount must be positive".to_string(),
            ));
        }
        // The wallet must exist before a funding request can target it.
        self.ledger.snapshot(account_id).await?;

        let topup = TopUpRequest {
            id: Uuid::new_v4(),
            account_id,
            requested_amount: request.requested_amount,
            approved_amount: None,
            payment_method: request.payment_method,
            payment_reference: request.payment_reference,
            receipt_ref: request.receipt_ref,
            client_notes: request.client_notes,
            admin_notes: None,
            rejection_reason: None,
            status: TopUpStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        };

        self.requests
            .write()
            .await
            .insert(topup.id, Arc::new(Mutex::new(topup.clone())));
        tracing::info!(request_id = %topup.id, %account_id, "top-up request submitted");
        Ok(topup)
    }

    /// Cancel a still-pending request. Only the owning client may cancel.
    pub async fn cancel(
        &self,
        request_id: Uuid,
        requesting_account_id: Uuid,
    ) -> Result<TopUpRequest, AppError> {
        let request = self.request(request_id).await?;
        let mut topup = request.lock().await;

        // A foreign request is indistinguishable from a missing one.
        if topup.account_id != requesting_account_id {
            return Err(AppError::NotFound("top-up request"));
        }
        if topup.status.is_terminal() {
            return Err(AppError::StateConflict(format!(
                "top-up request already {:?}",
                topup.status
            )));
        }

        topup.status = TopUpStatus::Cancelled;
        topup.resolved_at = Some(Utc::now());
        tracing::info!(%request_id, "top-up request cancelled");
        Ok(topup.clone())
    }

    /// Approve a pending request and credit the wallet.
    ///
    /// The status write and the ledger credit form one atomic unit under
    /// the request's mutex: if the credit fails, the request stays
    /// `pending`, so there is never an approved request without its
    /// ledger entry.
    pub async fn approve(
        &self,
        request_id: Uuid,
        approved_amount: i64,
        admin_notes: Option<String>,
    ) -> Result<TopUpRequest, AppError> {
        if approved_amount <= 0 {
            return Err(AppError::Validation(
                "approved_amount must be positive".to_string(),
            ));
        }

        let request = self.request(request_id).await?;
        let mut topup = request.lock().await;

        if topup.status.is_terminal() {
            return Err(AppError::StateConflict(format!(
                "top-up request already {:?}",
                topup.status
            )));
        }

        // Credit first; only mark approved once the entry exists.
        let entry = self
            .ledger
            .credit(
                topup.account_id,
                approved_amount,
                "top-up approved",
                Some(request_id),
            )
            .await?;

        topup.status = TopUpStatus::Approved;
        topup.approved_amount = Some(approved_amount);
        topup.admin_notes = admin_notes;
        topup.resolved_at = Some(Utc::now());

        tracing::info!(
            %request_id,
            account_id = %topup.account_id,
            approved_amount,
            entry_id = %entry.id,
            "top-up request approved and credited"
        );
        Ok(topup.clone())
    }

    /// Reject a pending request. No ledger effect.
    pub async fn reject(
        &self,
        request_id: Uuid,
        rejection_reason: String,
    ) -> Result<TopUpRequest, AppError> {
        let request = self.request(request_id).await?;
        let mut topup = request.lock().await;

        if topup.status.is_terminal() {
            return Err(AppError::StateConflict(format!(
                "top-up request already {:?}",
                topup.status
            )));
        }

        topup.status = TopUpStatus::Rejected;
        topup.rejection_reason = Some(rejection_reason);
        topup.resolved_at = Some(Utc::now());
        tracing::info!(%request_id, "top-up request rejected");
        Ok(topup.clone())
    }

    /// All requests belonging to one account, newest first.
    pub async fn list_for_account(&self, account_id: Uuid) -> Vec<TopUpRequest> {
        let mut out = Vec::new();
        for request in self.requests.read().await.values() {
            let topup = request.lock().await;
            if topup.account_id == account_id {
                out.push(topup.clone());
            }
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// All pending requests, oldest first (the admin review queue).
    pub async fn list_pending(&self) -> Vec<TopUpRequest> {
        let mut out = Vec::new();
        for request in self.requests.read().await.values() {
            let topup = request.lock().await;
            if topup.status == TopUpStatus::Pending {
                out.push(topup.clone());
            }
        }
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }

    async fn request(&self, request_id: Uuid) -> Result<Arc<Mutex<TopUpRequest>>, AppError> {
        self.requests
            .read()
            .await
            .get(&request_id)
            .cloned()
            .ok_or(AppError::NotFound("top-up request"))
    }
}
