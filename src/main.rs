//! Top-Up Service - Main Application Entry Point
//!
//! This is the transaction core of a utility top-up portal: a REST API server covering the wallet ledger, top-up funding requests, airtime/cashpower purchase recording, and API-key gated programmatic access.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **State**: in-process, per-account serialized via tokio mutexes
//! - **Authentication**: API key with SHA-256 hashing and ordered checks
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Build the service graph (ledger, top-ups, purchases, API keys)
//! 3. Seed the bootstrap admin key if configured
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Build service graph (and bootstrap admin key, if configured)
    let state = state::AppState::new(&config).await;
    tracing::info!("Services initialized");

    // Admin routes: require a key with admin access on top of the
    // standard authorization checks
    let admin_routes = Router::new()
        // Client onboarding
        .route("/api/v1/admin/accounts", post(handlers::admin::create_account))
        .route(
            "/api/v1/admin/accounts/{id}/deactivate",
            post(handlers::admin::deactivate_account),
        )
        // Top-up review queue
        .route("/api/v1/admin/topups", get(handlers::admin::list_pending_topups))
        .route(
            "/api/v1/admin/topups/{id}/approve",
            post(handlers::admin::approve_topup),
        )
        .route(
            "/api/v1/admin/topups/{id}/reject",
            post(handlers::admin::reject_topup),
        )
        // API key management
        .route("/api/v1/admin/keys", post(handlers::api_keys::create_key))
        .route("/api/v1/admin/keys", get(handlers::api_keys::list_keys))
        .route(
            "/api/v1/admin/keys/{id}/regenerate",
            post(handlers::api_keys::regenerate_key),
        )
        .route(
            "/api/v1/admin/keys/{id}",
            delete(handlers::api_keys::deactivate_key),
        )
        .route_layer(axum_middleware::from_fn(middleware::auth::require_admin));

    // Create authenticated routes (API endpoints)
    let authenticated_routes = Router::new()
        // Wallet routes
        .route("/api/v1/wallet", get(handlers::wallet::get_wallet))
        .route("/api/v1/wallet/entries", get(handlers::wallet::list_entries))
        // Top-up funding requests
        .route("/api/v1/topups", post(handlers::topups::submit_topup))
        .route("/api/v1/topups", get(handlers::topups::list_topups))
        .route(
            "/api/v1/topups/{id}/cancel",
            post(handlers::topups::cancel_topup),
        )
        // Purchases
        .route(
            "/api/v1/purchases/airtime",
            post(handlers::purchases::buy_airtime),
        )
        .route(
            "/api/v1/purchases/cashpower",
            post(handlers::purchases::buy_cashpower),
        )
        .route(
            "/api/v1/purchases/{id}/complete",
            post(handlers::purchases::complete_purchase),
        )
        .route(
            "/api/v1/purchases/{id}",
            get(handlers::purchases::get_purchase),
        )
        .route("/api/v1/purchases", get(handlers::purchases::list_purchases))
        // Admin routes share the same authorization middleware
        .merge(admin_routes)
        // Apply authorization middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Combine authenticated routes with public routes
    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        // Merge authenticated routes
        .merge(authenticated_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share the service graph with all handlers via State extraction
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests; connect info feeds the per-key IP
    // restriction checks
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
