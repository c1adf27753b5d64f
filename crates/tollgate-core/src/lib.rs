//! Core types for the tollgate credit ledger.
//!
//! This crate provides the foundational types used throughout the tollgate
//! platform:
//!
//! - **Identifiers**: `AccountId`, `EntryId`, `ToolId`, `WebhookEventId`
//! - **Accounts**: `Account` (overdraft policy, lifecycle)
//! - **Ledger**: `LedgerEntry`, `Direction`, `ApplyOutcome`, `IdempotencyRecord`
//! - **Webhooks**: `WebhookEvent`, `WebhookStatus`, `EventKind`
//! - **Validation**: operation limits shared by service and SDK
//!
//! # Credit Unit
//!
//! Balances are a single scalar per account, denominated in an abstract
//! credit with a fixed 1:1 mapping to a real-world currency unit. Stored as
//! `i64` to avoid floating point precision issues; the balance may go
//! negative only up to the account's overdraft limit.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod validate;
pub mod webhook;

pub use account::Account;
pub use error::{LedgerError, Result};
pub use ids::{AccountId, EntryId, IdError, ToolId, WebhookEventId};
pub use ledger::{ApplyOutcome, Direction, IdempotencyRecord, LedgerEntry};
pub use validate::{
    validate_amount, validate_idempotency_key, validate_reason, MAX_AMOUNT,
    MAX_IDEMPOTENCY_KEY_LEN, MAX_REASON_LEN,
};
pub use webhook::{
    EventKind, WebhookEvent, WebhookStatus, BASE_RETRY_DELAY_SECS, MAX_RETRIES,
    MAX_RETRY_DELAY_SECS,
};
