//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, admin, credits, health, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for consume/grant endpoints.
/// These serialize per account internally; the limit protects against
/// overload from high-volume tools.
const CREDITS_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Credits (tool API key; grant requires admin key)
/// - `POST /v1/credits/consume` - Atomically consume credits
/// - `POST /v1/credits/grant` - Grant credits
/// - `GET /v1/credits/balance/{account_id}` - Current balance
/// - `GET /v1/credits/entries/{account_id}` - Ledger history
///
/// ## Accounts (admin key)
/// - `POST /v1/accounts` - Register account
/// - `GET /v1/accounts/{account_id}` - Account with balance
/// - `DELETE /v1/accounts/{account_id}` - Deactivate account
///
/// ## Webhook administration (admin key)
/// - `GET /v1/webhooks/dead-letters` - Inspect dead-lettered events
/// - `GET /v1/webhooks/{event_id}` - Inspect one event
/// - `POST /v1/webhooks/{event_id}/replay` - Replay a dead-lettered event
///
/// ## Admin (admin key)
/// - `POST /v1/admin/reconcile` - Audit balances against the ledger
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Consume/grant carry their own concurrency limit; they are the
    // high-volume surface.
    let credits_routes = Router::new()
        .route("/consume", post(credits::consume))
        .route("/grant", post(credits::grant))
        .route("/balance/:account_id", get(credits::get_balance))
        .route("/entries/:account_id", get(credits::list_entries))
        .layer(ConcurrencyLimitLayer::new(CREDITS_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/:account_id", get(accounts::get_account))
        .route(
            "/accounts/:account_id",
            delete(accounts::deactivate_account),
        )
        // Webhook administration
        .route("/webhooks/dead-letters", get(webhooks::list_dead_letters))
        .route("/webhooks/:event_id", get(webhooks::get_event))
        .route("/webhooks/:event_id/replay", post(webhooks::replay))
        // Reconciliation
        .route("/admin/reconcile", post(admin::reconcile))
        // Credits (with their own concurrency limit)
        .nest("/credits", credits_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
