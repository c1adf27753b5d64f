//! `RocksDB` storage layer for the tollgate credit ledger.
//!
//! This crate provides persistent storage for accounts, the append-only
//! ledger, the materialized balance projection, idempotency records, and the
//! webhook delivery queue.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `accounts`: Account policy records, keyed by `account_id`
//! - `balances`: Materialized balance projection, keyed by `account_id`
//! - `entries`: Ledger entries, keyed by `entry_id` (ULID)
//! - `entries_by_account`: Index for listing entries by account
//! - `idempotency`: Idempotency records, keyed by the raw key
//! - `webhooks`: Webhook events, keyed by `event_id`
//! - `webhooks_due`: Index of pending webhook events by due time
//!
//! The compound `consume`/`grant` operations hold the account's lock while
//! they check idempotency, validate the balance, and commit one atomic
//! `WriteBatch` carrying the ledger entry, the updated balance, and the
//! idempotency record. No code path updates the balance outside that batch.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod locks;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use locks::{AccountLocks, DEFAULT_LOCK_TIMEOUT};
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tollgate_core::{
    Account, AccountId, ApplyOutcome, EntryId, IdempotencyRecord, LedgerEntry, ToolId,
    WebhookEvent, WebhookEventId,
};

/// Arguments to the atomic consume operation.
#[derive(Debug, Clone)]
pub struct ConsumeOp {
    /// The account to debit.
    pub account_id: AccountId,
    /// Amount of credits to consume (positive).
    pub amount: i64,
    /// Short human-readable reason.
    pub reason: String,
    /// Caller-supplied key for safe retries.
    pub idempotency_key: String,
    /// The vendor tool that triggered the consumption, if any.
    pub tool_id: Option<ToolId>,
}

/// Arguments to the atomic grant operation.
#[derive(Debug, Clone)]
pub struct GrantOp {
    /// The account to credit.
    pub account_id: AccountId,
    /// Amount of credits to grant (positive).
    pub amount: i64,
    /// Short human-readable reason.
    pub reason: String,
    /// Caller-supplied key for safe retries.
    pub idempotency_key: String,
    /// Open metadata bag for audit context.
    pub metadata: serde_json::Value,
}

/// A divergence between the materialized balance and the ledger sum.
///
/// Any mismatch is a hard alarm, never silently corrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceMismatch {
    /// The affected account.
    pub account_id: AccountId,
    /// The materialized balance on record.
    pub materialized: i64,
    /// The balance recomputed from the full ledger.
    pub computed: i64,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing the delivery pipeline
/// and service handlers to be tested against any implementation.
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert or update an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &Account) -> Result<()>;

    /// Get an account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>>;

    /// Deactivate an account. Accounts are never deleted.
    ///
    /// Returns the updated account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn deactivate_account(&self, account_id: &AccountId) -> Result<Account>;

    // =========================================================================
    // Balance & Ledger Operations
    // =========================================================================

    /// Read the materialized balance for an account (0 if no entries yet).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn balance(&self, account_id: &AccountId) -> Result<i64>;

    /// Get a ledger entry by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>>;

    /// List ledger entries for an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_entries(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>>;

    /// Look up an idempotency record by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_idempotency_record(&self, key: &str) -> Result<Option<IdempotencyRecord>>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Atomically consume credits from an account.
    ///
    /// Serialized per account: acquires the account lock, checks the
    /// idempotency key, validates the balance against the overdraft floor,
    /// then writes the debit entry, the new balance, and the idempotency
    /// record in one batch.
    ///
    /// # Errors
    ///
    /// - `StoreError::Validation` on malformed input.
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::AccountInactive` if the account was deactivated.
    /// - `StoreError::InsufficientCredits` if the debit would breach the floor.
    /// - `StoreError::LockTimeout` if the account lock wait expires.
    fn consume(&self, op: &ConsumeOp) -> Result<ApplyOutcome>;

    /// Atomically grant credits to an account.
    ///
    /// Symmetric to [`Store::consume`] but without the balance check.
    ///
    /// # Errors
    ///
    /// Same as [`Store::consume`] except `InsufficientCredits` cannot occur.
    fn grant(&self, op: &GrantOp) -> Result<ApplyOutcome>;

    /// Recompute every account's balance from the ledger and compare it to
    /// the materialized value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn reconcile(&self) -> Result<Vec<BalanceMismatch>>;

    // =========================================================================
    // Webhook Queue Operations
    // =========================================================================

    /// Insert or update a webhook event, maintaining the due-time index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_webhook(&self, event: &WebhookEvent) -> Result<()>;

    /// Get a webhook event by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_webhook(&self, event_id: &WebhookEventId) -> Result<Option<WebhookEvent>>;

    /// Claim pending events due at or before `now`, up to `limit`.
    ///
    /// Claimed events transition `pending -> retrying` before being
    /// returned; the transition acts as a lease so concurrent sweepers
    /// cannot double-deliver.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn claim_due_webhooks(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<WebhookEvent>>;

    /// List dead-lettered events, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_dead_letters(&self, limit: usize) -> Result<Vec<WebhookEvent>>;
}
