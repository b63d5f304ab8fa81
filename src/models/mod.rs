//! Data models representing domain entities.
//!
//! This module contains the entities of the transaction core and the
//! request/response types exposed over the API.

/// API key entity, permissions and management DTOs
pub mod api_key;
/// Wallet ledger entry entity
pub mod ledger;
/// Purchase transaction entity and DTOs
pub mod purchase;
/// Top-up funding request entity and DTOs
pub mod topup;
