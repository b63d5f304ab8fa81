//! API key management HTTP handlers (admin only).
//!
//! - POST   /api/v1/admin/keys - issue a key (secret shown once)
//! - GET    /api/v1/admin/keys - list keys in masked form
//! - POST   /api/v1/admin/keys/{id}/regenerate - rotate the secret
//! - DELETE /api/v1/admin/keys/{id} - deactivate (never deletes)

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::api_key::{ApiKeyResponse, CreateApiKeyRequest};
use crate::state::AppState;

/// Issue a new API key.
///
/// The response is the only place the raw secret ever appears; store it
/// now or rotate later.
pub async fn create_key(
    State(state): State<AppState>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    let (key, secret) = state.api_keys.create(request).await?;
    Ok(Json(ApiKeyResponse::from(key).with_secret(secret)))
}

/// List all keys. Secrets appear only in masked form
/// (first 8 + `****` + last 8).
pub async fn list_keys(State(state): State<AppState>) -> Json<Vec<ApiKeyResponse>> {
    let keys = state.api_keys.list().await;
    Json(keys.into_iter().map(Into::into).collect())
}

/// Rotate a key's secret.
///
/// The old secret is invalid the moment this returns; there is no grace
/// window. The new secret is shown once, here.
pub async fn regenerate_key(
    State(state): State<AppState>,
    Path(key_id): Path<Uuid>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    let (key, secret) = state.api_keys.regenerate(key_id).await?;
    Ok(Json(ApiKeyResponse::from(key).with_secret(secret)))
}

/// Deactivate a key. Usage history survives; this is a flag, not a
/// delete.
pub async fn deactivate_key(
    State(state): State<AppState>,
    Path(key_id): Path<Uuid>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    let key = state.api_keys.deactivate(key_id).await?;
    Ok(Json(key.into()))
}
