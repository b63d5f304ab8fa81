//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authorize requests
//! - Modify request/response
//! - Short-circuit requests (reject unauthorized)

/// API key authorization middleware
pub mod auth;
