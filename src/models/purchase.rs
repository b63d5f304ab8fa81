//! Purchase transaction model and API request/response types.
//!
//! A purchase transaction is a wallet-funded buy of airtime or electricity
//! (cashpower) tokens. The core debits the wallet up front, hands the
//! transaction to the external dispensing collaborator, and records the
//! collaborator's success/fail outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Carrier network derived from a phone-number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkCode {
    #[serde(rename = "AFRICELL_GM")]
    AfricellGm,
    #[serde(rename = "QCELL_GM")]
    QcellGm,
    #[serde(rename = "COMIUM_GM")]
    ComiumGm,
    #[serde(rename = "GAMCELL_GM")]
    GamcellGm,
}

impl NetworkCode {
    /// Wire code used by carrier integrations.
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkCode::AfricellGm => "AFRICELL_GM",
            NetworkCode::QcellGm => "QCELL_GM",
            NetworkCode::ComiumGm => "COMIUM_GM",
            NetworkCode::GamcellGm => "GAMCELL_GM",
        }
    }

    /// Parse a client-facing provider name, case-insensitively.
    ///
    /// Accepts `africell`, `qcell`, `comium`, `gamcel`. Anything else is
    /// None; there is no fallback carrier.
    pub fn from_provider_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "africell" => Some(NetworkCode::AfricellGm),
            "qcell" => Some(NetworkCode::QcellGm),
            "comium" => Some(NetworkCode::ComiumGm),
            "gamcel" => Some(NetworkCode::GamcellGm),
            _ => None,
        }
    }
}

/// Product line being purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseType {
    /// Mobile airtime top-up
    Airtime,
    /// Prepaid electricity token
    Cashpower,
}

/// Outcome state of a purchase transaction.
///
/// `pending` means the wallet has been debited and the dispensing
/// collaborator has not yet reported back. The transition out of
/// `pending` happens exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Success,
    Fail,
}

/// A wallet-funded purchase of airtime or electricity tokens.
///
/// Created only after a provisional debit succeeds; `debit_entry_id`
/// links back to that ledger entry. On a `fail` outcome the debit is
/// reversed with a compensating credit (new entry, never a mutation).
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseTransaction {
    /// Unique identifier; doubles as the callback handle for the
    /// dispensing collaborator
    pub id: Uuid,
    pub account_id: Uuid,
    pub purchase_type: PurchaseType,
    /// Normalized phone number (airtime) or meter number (cashpower)
    pub destination: String,
    /// Carrier network; None for cashpower purchases
    pub network_code: Option<NetworkCode>,
    pub amount_bututs: i64,
    pub status: PurchaseStatus,
    /// Provider-supplied failure message, set only on `fail`
    pub error_message: Option<String>,
    /// Ledger entry for the up-front debit
    pub debit_entry_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Request body for initiating an airtime purchase.
///
/// # JSON Example
///
/// ```json
/// {
///   "phone_number": "+2203123456",
///   "provider": "qcell",
///   "amount_bututs": 5000
/// }
/// ```
///
/// # Validation
///
/// - `phone_number`: `2203XXXXXX`, `+2203XXXXXX`, or 7-digit local format
/// - `provider`: optional; when present it must agree with the network
///   derived from the number (the system never silently guesses)
/// - `amount_bututs`: 500..=100000 (GMD 5-1000 inclusive)
#[derive(Debug, Deserialize)]
pub struct AirtimePurchaseRequest {
    pub phone_number: String,
    /// Client-declared provider name (africell|qcell|comium|gamcel)
    pub provider: Option<String>,
    pub amount_bututs: i64,
}

/// Request body for initiating a cashpower purchase.
#[derive(Debug, Deserialize)]
pub struct CashpowerPurchaseRequest {
    pub meter_number: String,
    pub amount_bututs: i64,
}

/// Outcome reported by the dispensing collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOutcome {
    Success,
    Fail,
}

/// Request body for the dispense callback.
///
/// # JSON Example
///
/// ```json
/// { "outcome": "fail", "error_message": "carrier timeout" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CompletePurchaseRequest {
    pub outcome: PurchaseOutcome,
    pub error_message: Option<String>,
}

/// Query parameters for the purchase history endpoint.
///
/// `limit` must be 1-500 (default 50), `offset >= 0`, and `end_date`
/// must be after `start_date` when both are given.
#[derive(Debug, Default, Deserialize)]
pub struct PurchaseQuery {
    /// Filter on outcome: success or fail
    pub status: Option<PurchaseStatus>,
    /// Filter on provider name (africell|qcell|comium|gamcel)
    pub provider: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response body for purchase endpoints.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub id: Uuid,
    pub purchase_type: PurchaseType,
    pub destination: String,
    pub network_code: Option<NetworkCode>,
    pub amount_bututs: i64,
    pub status: PurchaseStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Convert a PurchaseTransaction to its API response form.
///
/// Drops `account_id` and the internal `debit_entry_id` link.
impl From<PurchaseTransaction> for PurchaseResponse {
    fn from(t: PurchaseTransaction) -> Self {
        Self {
            id: t.id,
            purchase_type: t.purchase_type,
            destination: t.destination,
            network_code: t.network_code,
            amount_bututs: t.amount_bututs,
            status: t.status,
            error_message: t.error_message,
            created_at: t.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_parse_case_insensitively() {
        assert_eq!(
            NetworkCode::from_provider_name("Africell"),
            Some(NetworkCode::AfricellGm)
        );
        assert_eq!(
            NetworkCode::from_provider_name("QCELL"),
            Some(NetworkCode::QcellGm)
        );
        assert_eq!(
            NetworkCode::from_provider_name("comium"),
            Some(NetworkCode::ComiumGm)
        );
        assert_eq!(
            NetworkCode::from_provider_name("gamcel"),
            Some(NetworkCode::GamcellGm)
        );
        assert_eq!(NetworkCode::from_provider_name("orange"), None);
    }

    #[test]
    fn wire_codes_match_carrier_integration_format() {
        assert_eq!(NetworkCode::QcellGm.as_str(), "QCELL_GM");
        assert_eq!(NetworkCode::GamcellGm.as_str(), "GAMCELL_GM");
    }
}
