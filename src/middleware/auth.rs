//! API key authorization middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the API key from the Authorization header
//! 2. Work out the request's endpoint, mutation flag, client IP and
//!    requested service
//! 3. Run the key through the ordered authorization checks
//! 4. Inject an `AuthContext` into the request for handlers
//!
//! Admin routes additionally pass through `require_admin`.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::{AppError, DenyReason};
use crate::models::purchase::PurchaseType;
use crate::state::AppState;

/// Authorization context attached to authenticated requests.
///
/// Inserted into the request's extension map; route handlers extract it
/// with `Extension<AuthContext>` to know which wallet the key acts for.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authorized API key
    pub key_id: Uuid,

    /// Wallet account the key operates on behalf of
    pub account_id: Uuid,

    /// Whether the key carries admin access
    pub is_admin: bool,
}

/// API key authorization middleware function.
///
/// Expected header format:
/// ```text
/// Authorization: Bearer <secret>
/// ```
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Extract the bearer secret.
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::AuthDenied(DenyReason::NotFound))?;
    let secret = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::AuthDenied(DenyReason::NotFound))?;

    let endpoint = request.uri().path().to_string();
    // Anything that isn't a plain read counts as a mutation.
    let is_mutation = !matches!(request.method().as_str(), "GET" | "HEAD");
    let request_ip = client_ip(&request);
    let requested_service = service_for_path(&endpoint);

    let key = state
        .api_keys
        .authorize(secret, &endpoint, is_mutation, request_ip, requested_service)
        .await?;

    request.extensions_mut().insert(AuthContext {
        key_id: key.id,
        account_id: key.client_id,
        is_admin: key.permissions.admin_access,
    });

    Ok(next.run(request).await)
}

/// Gate for `/api/v1/admin` routes: the key must carry admin access.
///
/// Runs after `auth_middleware`, so the context is always present.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let is_admin = request
        .extensions()
        .get::<AuthContext>()
        .map(|ctx| ctx.is_admin)
        .unwrap_or(false);
    if !is_admin {
        return Err(AppError::AuthDenied(DenyReason::EndpointNotAllowed));
    }
    Ok(next.run(request).await)
}

/// Best-effort client IP: first `X-Forwarded-For` entry when present,
/// else the socket peer address.
fn client_ip(request: &Request) -> Option<IpAddr> {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            if let Ok(ip) = first.trim().parse() {
                return Some(ip);
            }
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

/// Which product line a path operates on, for the service-scope check.
fn service_for_path(path: &str) -> Option<PurchaseType> {
    if path.starts_with("/api/v1/purchases/airtime") {
        Some(PurchaseType::Airtime)
    } else if path.starts_with("/api/v1/purchases/cashpower") {
        Some(PurchaseType::Cashpower)
    } else {
        None
    }
}
