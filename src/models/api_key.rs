//! API key model for programmatic access.
//!
//! API keys gate programmatic access to the purchase and top-up
//! operations. Secrets are stored as SHA-256 hashes; the raw secret is
//! shown exactly once at creation or regeneration, and only a masked
//! form afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::purchase::PurchaseType;

/// Which product lines a key may operate on.
///
/// A single closed enum instead of `is_airtime`/`is_cashpower`/`is_both`
/// flags, so invalid combinations (all false, conflicting flags) cannot
/// be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceScope {
    Airtime,
    Cashpower,
    Both,
}

impl ServiceScope {
    /// Whether this scope covers a purchase of the given type.
    pub fn covers(&self, service: PurchaseType) -> bool {
        match self {
            ServiceScope::Both => true,
            ServiceScope::Airtime => service == PurchaseType::Airtime,
            ServiceScope::Cashpower => service == PurchaseType::Cashpower,
        }
    }
}

/// Endpoint and mutation permissions attached to a key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyPermissions {
    /// Path patterns this key may call. `"*"` matches everything; a
    /// trailing `*` matches by prefix; anything else matches exactly.
    pub allowed_endpoints: Vec<String>,

    /// Read-only keys are denied every mutating operation
    #[serde(default)]
    pub read_only: bool,

    /// Admin keys bypass endpoint checks and may call admin routes
    #[serde(default)]
    pub admin_access: bool,
}

/// An API key record.
///
/// Deactivation is a flag, not a delete: usage history must survive
/// revocation.
#[derive(Debug, Clone)]
pub struct ApiKey {
    /// Unique identifier for this key
    pub id: Uuid,

    /// Wallet account this key operates on behalf of
    pub client_id: Uuid,

    /// Human-readable label, 3-50 characters
    pub name: String,

    /// SHA-256 hash of the current secret (64 hex characters)
    pub secret_hash: String,

    /// Masked form of the current secret, safe for listings:
    /// first 8 + `****` + last 8 characters
    pub masked_secret: String,

    pub permissions: ApiKeyPermissions,

    /// Exact IPs or CIDR blocks allowed to use this key; empty means
    /// no IP restriction
    pub ip_restrictions: Vec<String>,

    pub service_scope: ServiceScope,

    pub is_active: bool,

    /// None means the key never expires
    pub expires_at: Option<DateTime<Utc>>,

    /// Reset on regeneration
    pub last_used_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

/// Request body for creating an API key.
///
/// # JSON Example
///
/// ```json
/// {
///   "client_id": "550e8400-e29b-41d4-a716-446655440000",
///   "name": "reseller-integration",
///   "permissions": {
///     "allowed_endpoints": ["/api/v1/purchases/*"],
///     "read_only": false,
///     "admin_access": false
///   },
///   "ip_restrictions": ["196.223.145.0/24"],
///   "service_scope": "airtime",
///   "expires_at": "2027-01-01T00:00:00Z"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    /// Account the key will act for
    pub client_id: Uuid,

    /// Label, 3-50 characters
    pub name: String,

    pub permissions: ApiKeyPermissions,

    #[serde(default)]
    pub ip_restrictions: Vec<String>,

    pub service_scope: ServiceScope,

    /// Optional ISO-8601 expiry
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response body for key listings. Never contains the raw secret.
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub masked_secret: String,
    pub permissions: ApiKeyPermissions,
    pub ip_restrictions: Vec<String>,
    pub service_scope: ServiceScope,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,

    /// Raw secret, present only in the creation/regeneration response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            client_id: key.client_id,
            name: key.name,
            masked_secret: key.masked_secret,
            permissions: key.permissions,
            ip_restrictions: key.ip_restrictions,
            service_scope: key.service_scope,
            is_active: key.is_active,
            expires_at: key.expires_at,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
            // Never include the secret by default
            secret: None,
        }
    }
}

impl ApiKeyResponse {
    /// Attach the raw secret (only for create/regenerate responses).
    pub fn with_secret(mut self, secret: String) -> Self {
        self.secret = Some(secret);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_covers_matching_service_only() {
        assert!(ServiceScope::Airtime.covers(PurchaseType::Airtime));
        assert!(!ServiceScope::Airtime.covers(PurchaseType::Cashpower));
        assert!(!ServiceScope::Cashpower.covers(PurchaseType::Airtime));
        assert!(ServiceScope::Both.covers(PurchaseType::Airtime));
        assert!(ServiceScope::Both.covers(PurchaseType::Cashpower));
    }
}
