//! API key issuance, authorization, rotation and revocation.
//!
//! Keys are looked up by the SHA-256 hash of the presented secret and run
//! through a fixed sequence of checks; the first failure wins, so error
//! responses leak the minimum about which rule tripped. The endpoint and
//! IP predicates are pure free functions with their own tests.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use ipnetwork::IpNetwork;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, DenyReason};
use crate::models::api_key::{ApiKey, CreateApiKeyRequest, ServiceScope};
use crate::models::purchase::PurchaseType;

/// Key registry: id-keyed records plus a secret-hash index.
///
/// Both maps live under one lock so a rotation swaps the hash index and
/// the record atomically; there is no window where old and new secrets
/// are both valid.
#[derive(Debug, Default)]
struct KeyRegistry {
    by_id: HashMap<Uuid, ApiKey>,
    by_hash: HashMap<String, Uuid>,
}

/// API key service.
///
/// The registry is `Arc`'d so the fire-and-forget `last_used_at` write
/// can run on a detached task after the authorization decision returns.
pub struct ApiKeyService {
    registry: Arc<RwLock<KeyRegistry>>,
}

impl ApiKeyService {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RwLock::new(KeyRegistry::default())),
        }
    }

    /// Issue a new key. Returns the record and the raw secret; the secret
    /// is never recoverable afterwards.
    pub async fn create(
        &self,
        request: CreateApiKeyRequest,
    ) -> Result<(ApiKey, String), AppError> {
        let name = request.name.trim();
        if name.len() < 3 || name.len() > 50 {
            return Err(AppError::Validation(
                "name: must be 3-50 characters".to_string(),
            ));
        }
        for restriction in &request.ip_restrictions {
            if !is_valid_ip_pattern(restriction) {
                return Err(AppError::Validation(format!(
                    "ip_restrictions: '{restriction}' is not an IP or CIDR block"
                )));
            }
        }
        if let Some(expires_at) = request.expires_at {
            if expires_at <= Utc::now() {
                return Err(AppError::Validation(
                    "expires_at: must be in the future".to_string(),
                ));
            }
        }

        let secret = generate_secret();
        let key = ApiKey {
            id: Uuid::new_v4(),
            client_id: request.client_id,
            name: name.to_string(),
            secret_hash: hash_secret(&secret),
            masked_secret: mask_secret(&secret),
            permissions: request.permissions,
            ip_restrictions: request.ip_restrictions,
            service_scope: request.service_scope,
            is_active: true,
            expires_at: request.expires_at,
            last_used_at: None,
            created_at: Utc::now(),
        };

        let mut registry = self.registry.write().await;
        registry.by_hash.insert(key.secret_hash.clone(), key.id);
        registry.by_id.insert(key.id, key.clone());
        tracing::info!(key_id = %key.id, name = %key.name, "api key issued");
        Ok((key, secret))
    }

    /// Seed an admin key from a preconfigured secret (bootstrap only).
    pub async fn seed_admin(&self, secret: &str) -> ApiKey {
        let key = ApiKey {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            name: "bootstrap-admin".to_string(),
            secret_hash: hash_secret(secret),
            masked_secret: mask_secret(secret),
            permissions: crate::models::api_key::ApiKeyPermissions {
                allowed_endpoints: vec!["*".to_string()],
                read_only: false,
                admin_access: true,
            },
            ip_restrictions: Vec::new(),
            service_scope: ServiceScope::Both,
            is_active: true,
            expires_at: None,
            last_used_at: None,
            created_at: Utc::now(),
        };
        let mut registry = self.registry.write().await;
        registry.by_hash.insert(key.secret_hash.clone(), key.id);
        registry.by_id.insert(key.id, key.clone());
        tracing::info!(key_id = %key.id, "bootstrap admin key seeded");
        key
    }

    /// Validate a presented secret against the full rule set.
    ///
    /// Checks run in a fixed order and short-circuit on the first
    /// failure: lookup, active, expiry, IP restriction, endpoint,
    /// read-only, service scope. On success `last_used_at` is updated on
    /// a detached task; that write is best-effort and never delays or
    /// fails the authorization decision.
    pub async fn authorize(
        &self,
        presented_secret: &str,
        endpoint: &str,
        is_mutation: bool,
        request_ip: Option<IpAddr>,
        requested_service: Option<PurchaseType>,
    ) -> Result<ApiKey, AppError> {
        let key = {
            let registry = self.registry.read().await;
            let key_id = registry
                .by_hash
                .get(&hash_secret(presented_secret))
                .copied()
                .ok_or(AppError::AuthDenied(DenyReason::NotFound))?;
            registry
                .by_id
                .get(&key_id)
                .cloned()
                .ok_or(AppError::AuthDenied(DenyReason::NotFound))?
        };

        if !key.is_active {
            return Err(AppError::AuthDenied(DenyReason::Inactive));
        }
        if let Some(expires_at) = key.expires_at {
            if expires_at <= Utc::now() {
                return Err(AppError::AuthDenied(DenyReason::Expired));
            }
        }
        if !key.ip_restrictions.is_empty() {
            let allowed = request_ip
                .map(|ip| ip_allowed(&key.ip_restrictions, ip))
                .unwrap_or(false);
            if !allowed {
                return Err(AppError::AuthDenied(DenyReason::IpNotAllowed));
            }
        }
        // Admin keys bypass endpoint patterns entirely.
        if !key.permissions.admin_access
            && !endpoint_allowed(&key.permissions.allowed_endpoints, endpoint)
        {
            return Err(AppError::AuthDenied(DenyReason::EndpointNotAllowed));
        }
        if is_mutation && key.permissions.read_only {
            return Err(AppError::AuthDenied(DenyReason::ReadOnly));
        }
        if let Some(service) = requested_service {
            if !key.service_scope.covers(service) {
                return Err(AppError::AuthDenied(DenyReason::ServiceNotAllowed));
            }
        }

        // Fire-and-forget usage stamp, outside every lock the decision
        // took.
        let registry = self.registry.clone();
        let key_id = key.id;
        tokio::spawn(async move {
            let mut registry = registry.write().await;
            if let Some(stored) = registry.by_id.get_mut(&key_id) {
                stored.last_used_at = Some(Utc::now());
            } else {
                tracing::debug!(%key_id, "last_used_at update skipped, key gone");
            }
        });

        Ok(key)
    }

    /// Rotate a key's secret.
    ///
    /// The hash index swap happens under the registry write lock: every
    /// authorization issued after this commits sees only the new secret.
    /// `last_used_at` resets with the rotation.
    pub async fn regenerate(&self, key_id: Uuid) -> Result<(ApiKey, String), AppError> {
        let secret = generate_secret();
        let mut registry = self.registry.write().await;

        let key = registry
            .by_id
            .get_mut(&key_id)
            .ok_or(AppError::NotFound("api key"))?;

        let old_hash = std::mem::replace(&mut key.secret_hash, hash_secret(&secret));
        key.masked_secret = mask_secret(&secret);
        key.last_used_at = None;
        let updated = key.clone();

        registry.by_hash.remove(&old_hash);
        registry.by_hash.insert(updated.secret_hash.clone(), key_id);

        tracing::info!(%key_id, "api key secret rotated, previous secret invalidated");
        Ok((updated, secret))
    }

    /// Deactivate a key. A flag, not a delete: usage history survives.
    pub async fn deactivate(&self, key_id: Uuid) -> Result<ApiKey, AppError> {
        let mut registry = self.registry.write().await;
        let key = registry
            .by_id
            .get_mut(&key_id)
            .ok_or(AppError::NotFound("api key"))?;
        key.is_active = false;
        tracing::info!(%key_id, "api key deactivated");
        Ok(key.clone())
    }

    /// All keys, newest first. Secrets appear only in masked form.
    pub async fn list(&self) -> Vec<ApiKey> {
        let registry = self.registry.read().await;
        let mut keys: Vec<ApiKey> = registry.by_id.values().cloned().collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        keys
    }
}

impl Default for ApiKeyService {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 hash of a secret, hex-encoded, as stored at rest.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a cryptographically random secret (32 bytes, 64 hex chars).
fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Masked display form: first 8 and last 8 characters, middle replaced.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 16 {
        return "****".to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{head}****{tail}")
}

/// Whether an endpoint matches any allowed pattern.
///
/// `"*"` matches everything; a trailing `*` matches by prefix; anything
/// else must match exactly.
pub fn endpoint_allowed(patterns: &[String], endpoint: &str) -> bool {
    patterns.iter().any(|pattern| {
        if pattern == "*" {
            true
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            endpoint.starts_with(prefix)
        } else {
            pattern == endpoint
        }
    })
}

/// Whether an IP matches any restriction entry (exact IP or CIDR block).
///
/// Unparseable entries match nothing.
pub fn ip_allowed(restrictions: &[String], ip: IpAddr) -> bool {
    restrictions.iter().any(|entry| {
        if entry.contains('/') {
            entry
                .parse::<IpNetwork>()
                .map(|network| network.contains(ip))
                .unwrap_or(false)
        } else {
            entry.parse::<IpAddr>().map(|allowed| allowed == ip).unwrap_or(false)
        }
    })
}

fn is_valid_ip_pattern(entry: &str) -> bool {
    if entry.contains('/') {
        entry.parse::<IpNetwork>().is_ok()
    } else {
        entry.parse::<IpAddr>().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api_key::ApiKeyPermissions;
    use chrono::Duration;

    fn request(name: &str) -> CreateApiKeyRequest {
        CreateApiKeyRequest {
            client_id: Uuid::new_v4(),
            name: name.to_string(),
            permissions: ApiKeyPermissions {
                allowed_endpoints: vec!["/api/v1/purchases/*".to_string()],
                read_only: false,
                admin_access: false,
            },
            ip_restrictions: Vec::new(),
            service_scope: ServiceScope::Both,
            expires_at: None,
        }
    }

    #[test]
    fn endpoint_patterns_match_exact_prefix_and_star() {
        let patterns = vec![
            "/api/v1/wallet".to_string(),
            "/api/v1/purchases/*".to_string(),
        ];
        assert!(endpoint_allowed(&patterns, "/api/v1/wallet"));
        assert!(endpoint_allowed(&patterns, "/api/v1/purchases/airtime"));
        assert!(!endpoint_allowed(&patterns, "/api/v1/topups"));
        assert!(!endpoint_allowed(&patterns, "/api/v1/wallet/entries"));

        let star = vec!["*".to_string()];
        assert!(endpoint_allowed(&star, "/anything/at/all"));
        assert!(!endpoint_allowed(&[], "/api/v1/wallet"));
    }

    #[test]
    fn ip_matching_supports_exact_and_cidr() {
        let restrictions = vec!["10.0.0.7".to_string(), "196.223.145.0/24".to_string()];
        assert!(ip_allowed(&restrictions, "10.0.0.7".parse().unwrap()));
        assert!(ip_allowed(&restrictions, "196.223.145.200".parse().unwrap()));
        assert!(!ip_allowed(&restrictions, "196.223.146.1".parse().unwrap()));
        assert!(!ip_allowed(&restrictions, "10.0.0.8".parse().unwrap()));

        // Garbage entries match nothing rather than everything.
        assert!(!ip_allowed(&["not-an-ip".to_string()], "10.0.0.7".parse().unwrap()));
    }

    #[test]
    fn masking_shows_only_the_edges() {
        let secret = "abcdefgh0123456789ijklmnopqrstuv";
        let masked = mask_secret(secret);
        assert!(masked.starts_with("abcdefgh"));
        assert!(masked.ends_with("qrstuv"));
        assert!(!masked.contains("0123456789"));
        assert_eq!(mask_secret("short"), "****");
    }

    #[tokio::test]
    async fn authorize_accepts_matching_endpoint_and_rejects_others() {
        let service = Arc::new(ApiKeyService::new());
        let (_, secret) = service.create(request("reseller")).await.unwrap();

        assert!(
            service
                .authorize(&secret, "/api/v1/purchases/airtime", true, None, Some(PurchaseType::Airtime))
                .await
                .is_ok()
        );
        let err = service
            .authorize(&secret, "/api/v1/admin/keys", false, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthDenied(DenyReason::EndpointNotAllowed)));
    }

    #[tokio::test]
    async fn unknown_secret_is_denied() {
        let service = Arc::new(ApiKeyService::new());
        let err = service
            .authorize("no-such-secret", "/api/v1/wallet", false, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthDenied(DenyReason::NotFound)));
    }

    #[tokio::test]
    async fn successful_authorization_stamps_last_used_at() {
        let service = Arc::new(ApiKeyService::new());
        let (key, secret) = service.create(request("stamped")).await.unwrap();
        assert_eq!(key.last_used_at, None);

        service
            .authorize(&secret, "/api/v1/purchases/airtime", false, None, None)
            .await
            .unwrap();

        // The stamp lands on a detached task; give it a beat.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let stored = service
            .list()
            .await
            .into_iter()
            .find(|k| k.id == key.id)
            .unwrap();
        assert!(stored.last_used_at.is_some());
    }

    #[tokio::test]
    async fn denied_authorization_leaves_last_used_at_unset() {
        let service = Arc::new(ApiKeyService::new());
        let (key, secret) = service.create(request("never-used")).await.unwrap();

        let err = service
            .authorize(&secret, "/api/v1/admin/keys", false, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthDenied(DenyReason::EndpointNotAllowed)));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let stored = service
            .list()
            .await
            .into_iter()
            .find(|k| k.id == key.id)
            .unwrap();
        assert_eq!(stored.last_used_at, None);
    }

    #[tokio::test]
    async fn rotation_invalidates_the_old_secret_immediately() {
        let service = Arc::new(ApiKeyService::new());
        let (key, old_secret) = service.create(request("rotate-me")).await.unwrap();

        let (rotated, new_secret) = service.regenerate(key.id).await.unwrap();
        assert_ne!(old_secret, new_secret);
        assert_eq!(rotated.last_used_at, None);

        let err = service
            .authorize(&old_secret, "/api/v1/purchases/airtime", false, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthDenied(DenyReason::NotFound)));

        assert!(
            service
                .authorize(&new_secret, "/api/v1/purchases/airtime", false, None, None)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn expired_key_is_denied_regardless_of_permissions() {
        let service = Arc::new(ApiKeyService::new());
        let mut req = request("expiring");
        req.permissions.admin_access = true;
        req.expires_at = Some(Utc::now() + Duration::seconds(1));
        let (key, secret) = service.create(req).await.unwrap();

        // Force the stored expiry into the past.
        {
            let mut registry = service.registry.write().await;
            registry.by_id.get_mut(&key.id).unwrap().expires_at =
                Some(Utc::now() - Duration::minutes(1));
        }

        let err = service
            .authorize(&secret, "/api/v1/wallet", false, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthDenied(DenyReason::Expired)));
    }

    #[tokio::test]
    async fn read_only_key_is_denied_mutations_even_on_allowed_endpoints() {
        let service = Arc::new(ApiKeyService::new());
        let mut req = request("read-only");
        req.permissions.read_only = true;
        let (_, secret) = service.create(req).await.unwrap();

        assert!(
            service
                .authorize(&secret, "/api/v1/purchases/history", false, None, None)
                .await
                .is_ok()
        );
        let err = service
            .authorize(&secret, "/api/v1/purchases/airtime", true, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthDenied(DenyReason::ReadOnly)));
    }

    #[tokio::test]
    async fn ip_restricted_key_requires_a_matching_ip() {
        let service = Arc::new(ApiKeyService::new());
        let mut req = request("locked-down");
        req.ip_restrictions = vec!["196.223.145.0/24".to_string()];
        let (_, secret) = service.create(req).await.unwrap();

        let ok_ip: IpAddr = "196.223.145.10".parse().unwrap();
        let bad_ip: IpAddr = "41.77.0.1".parse().unwrap();

        assert!(
            service
                .authorize(&secret, "/api/v1/purchases/airtime", false, Some(ok_ip), None)
                .await
                .is_ok()
        );
        for ip in [Some(bad_ip), None] {
            let err = service
                .authorize(&secret, "/api/v1/purchases/airtime", false, ip, None)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::AuthDenied(DenyReason::IpNotAllowed)));
        }
    }

    #[tokio::test]
    async fn service_scope_gates_purchase_services() {
        let service = Arc::new(ApiKeyService::new());
        let mut req = request("airtime-only");
        req.service_scope = ServiceScope::Airtime;
        req.permissions.allowed_endpoints = vec!["*".to_string()];
        let (_, secret) = service.create(req).await.unwrap();

        assert!(
            service
                .authorize(&secret, "/api/v1/purchases/airtime", true, None, Some(PurchaseType::Airtime))
                .await
                .is_ok()
        );
        let err = service
            .authorize(&secret, "/api/v1/purchases/cashpower", true, None, Some(PurchaseType::Cashpower))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthDenied(DenyReason::ServiceNotAllowed)));
    }

    #[tokio::test]
    async fn deactivated_key_is_denied_but_survives() {
        let service = Arc::new(ApiKeyService::new());
        let (key, secret) = service.create(request("revoked")).await.unwrap();
        service.deactivate(key.id).await.unwrap();

        let err = service
            .authorize(&secret, "/api/v1/purchases/airtime", false, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthDenied(DenyReason::Inactive)));

        // Still listed (masked), not deleted.
        assert!(service.list().await.iter().any(|k| k.id == key.id));
    }

    #[tokio::test]
    async fn admin_access_bypasses_endpoint_checks() {
        let service = Arc::new(ApiKeyService::new());
        let mut req = request("admin");
        req.permissions.admin_access = true;
        req.permissions.allowed_endpoints = Vec::new();
        let (_, secret) = service.create(req).await.unwrap();

        assert!(
            service
                .authorize(&secret, "/api/v1/admin/keys", true, None, None)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn create_validates_name_and_ip_patterns() {
        let service = Arc::new(ApiKeyService::new());

        assert!(matches!(
            service.create(request("ab")).await,
            Err(AppError::Validation(_))
        ));

        let mut req = request("bad-ips");
        req.ip_restrictions = vec!["999.1.2.3".to_string()];
        assert!(matches!(service.create(req).await, Err(AppError::Validation(_))));

        let mut req = request("stale");
        req.expires_at = Some(Utc::now() - Duration::days(1));
        assert!(matches!(service.create(req).await, Err(AppError::Validation(_))));
    }
}
