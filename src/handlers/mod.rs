//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to the services for business logic
//! 3. Returns HTTP response (JSON, status code)

/// Admin endpoints: account onboarding, top-up decisions
pub mod admin;
/// API key management endpoints (admin)
pub mod api_keys;
/// Health check endpoint
pub mod health;
/// Purchase initiation, dispense callback and history
pub mod purchases;
/// Top-up funding request endpoints
pub mod topups;
/// Wallet balance and ledger endpoints
pub mod wallet;
