//! Shared application state.
//!
//! All services live behind `Arc`s in one cloneable struct that axum
//! hands to every handler via `State` extraction.

use std::sync::Arc;

use crate::config::Config;
use crate::services::api_key_service::ApiKeyService;
use crate::services::purchase_service::PurchaseService;
use crate::services::topup_service::TopUpService;
use crate::services::wallet_ledger::WalletLedger;

/// Application-wide state shared across handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<WalletLedger>,
    pub topups: Arc<TopUpService>,
    pub purchases: Arc<PurchaseService>,
    pub api_keys: Arc<ApiKeyService>,
}

impl AppState {
    /// Build the service graph and, when configured, seed the bootstrap
    /// admin key so key management is reachable on a fresh instance.
    pub async fn new(config: &Config) -> Self {
        let ledger = Arc::new(WalletLedger::new());
        let topups = Arc::new(TopUpService::new(ledger.clone()));
        let purchases = Arc::new(PurchaseService::new(ledger.clone()));
        let api_keys = Arc::new(ApiKeyService::new());

        if let Some(ref secret) = config.bootstrap_admin_key {
            api_keys.seed_admin(secret).await;
        } else {
            tracing::warn!("no BOOTSTRAP_ADMIN_KEY set; admin endpoints will be unreachable");
        }

        Self {
            ledger,
            topups,
            purchases,
            api_keys,
        }
    }
}
