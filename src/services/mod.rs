//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers:
//! the wallet ledger, the top-up request state machine, purchase
//! recording, API-key authorization, and phone/network resolution.

pub mod api_key_service;
pub mod phone;
pub mod purchase_service;
pub mod topup_service;
pub mod wallet_ledger;
