//! Top-up funding request model and API request/response types.
//!
//! A top-up request is a customer-initiated request to add funds to their
//! wallet. It carries a payment reference and an uploaded-receipt handle,
//! and only touches the ledger once an admin approves it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the customer claims to have paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    MobileMoney,
    CardPayment,
    Cash,
}

/// Lifecycle state of a top-up request.
///
/// `pending` is the only non-terminal state. Once a request reaches
/// `approved`, `rejected` or `cancelled` it is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopUpStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl TopUpStatus {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TopUpStatus::Pending)
    }
}

/// A customer-submitted wallet funding request.
///
/// Created by the client in `pending`; mutated only by an admin action
/// (approve/reject) or by the owning client while still pending (cancel).
#[derive(Debug, Clone, Serialize)]
pub struct TopUpRequest {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Amount the customer asked for, in bututs
    pub requested_amount: i64,
    /// Amount the admin actually credited; None until resolved, and may
    /// differ from `requested_amount`
    pub approved_amount: Option<i64>,
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
    /// Opaque handle to the uploaded receipt in the external file store
    pub receipt_ref: Option<String>,
    pub client_notes: Option<String>,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub status: TopUpStatus,
    pub created_at: DateTime<Utc>,
    /// When the request left `pending`
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Request body for submitting a top-up request.
///
/// # JSON Example
///
/// ```json
/// {
///   "requested_amount": 50000,
///   "payment_method": "bank_transfer",
///   "payment_reference": "TRX-2024-0091",
///   "receipt_ref": "uploads/receipts/0091.jpg",
///   "client_notes": "Transferred from Trust Bank"
/// }
/// ```
///
/// # Validation
///
/// - `requested_amount`: required, must be positive. Deliberately has no
///   upper bound, unlike purchase amounts.
#[derive(Debug, Deserialize)]
pub struct SubmitTopUpRequest {
    /// Amount to fund, in bututs
    pub requested_amount: i64,
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
    /// Reference to an externally stored receipt file
    pub receipt_ref: Option<String>,
    pub client_notes: Option<String>,
}

/// Request body for approving a top-up request.
#[derive(Debug, Deserialize)]
pub struct ApproveTopUpRequest {
    /// Amount to credit, in bututs; may differ from the requested amount
    pub approved_amount: i64,
    pub admin_notes: Option<String>,
}

/// Request body for rejecting a top-up request.
#[derive(Debug, Deserialize)]
pub struct RejectTopUpRequest {
    pub rejection_reason: String,
}

/// Response body for top-up request endpoints.
#[derive(Debug, Serialize)]
pub struct TopUpResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub requested_amount: i64,
    pub approved_amount: Option<i64>,
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
    pub receipt_ref: Option<String>,
    pub client_notes: Option<String>,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub status: TopUpStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<TopUpRequest> for TopUpResponse {
    fn from(r: TopUpRequest) -> Self {
        Self {
            id: r.id,
            account_id: r.account_id,
            requested_amount: r.requested_amount,
            approved_amount: r.approved_amount,
            payment_method: r.payment_method,
            payment_reference: r.payment_reference,
            receipt_ref: r.receipt_ref,
            client_notes: r.client_notes,
            admin_notes: r.admin_notes,
            rejection_reason: r.rejection_reason,
            status: r.status,
            created_at: r.created_at,
            resolved_at: r.resolved_at,
        }
    }
}
