//! Tollgate HTTP API Service.
//!
//! This crate provides the HTTP API for the tollgate credit ledger,
//! including:
//!
//! - Atomic credit consumption and grants with idempotency keys
//! - Balance and ledger history reads
//! - Account administration (registration, overdraft policy, deactivation)
//! - Webhook queue administration and balance reconciliation
//!
//! # Authentication
//!
//! Two API-key schemes:
//!
//! 1. **Tool API keys** - For vendor tool requests (consume, reads)
//! 2. **Admin API keys** - For grants, accounts, replay, and reconciliation

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for the router

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
