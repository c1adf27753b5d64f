//! Ledger entry types.
//!
//! The ledger is an append-only log of balance-changing events and the
//! single source of truth for every account balance. Entries are never
//! updated or deleted once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, EntryId, ToolId};

/// Direction of a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Balance increases (purchase, grant, adjustment).
    Credit,
    /// Balance decreases (consumption).
    Debit,
}

/// An immutable fact recording one balance change.
///
/// `balance_after` is stored redundantly for fast auditing: for any entry it
/// must equal the signed sum of all entries for that account up to and
/// including this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID (ULID for time-ordering).
    pub entry_id: EntryId,

    /// The account whose balance changed.
    pub account_id: AccountId,

    /// Direction of the change.
    pub direction: Direction,

    /// Amount in credits. Always positive, never zero.
    pub amount: i64,

    /// The materialized balance immediately after this entry was applied.
    pub balance_after: i64,

    /// Short human-readable reason.
    pub reason: String,

    /// The vendor tool that triggered the entry, if any.
    pub tool_id: Option<ToolId>,

    /// Caller-supplied key; unique per logical operation.
    pub idempotency_key: String,

    /// Open key-value bag for audit context.
    pub metadata: serde_json::Value,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a credit entry.
    #[must_use]
    pub fn credit(
        account_id: AccountId,
        amount: i64,
        balance_after: i64,
        reason: String,
        idempotency_key: String,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            entry_id: EntryId::generate(),
            account_id,
            direction: Direction::Credit,
            amount,
            balance_after,
            reason,
            tool_id: None,
            idempotency_key,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Create a debit entry.
    #[must_use]
    pub fn debit(
        account_id: AccountId,
        amount: i64,
        balance_after: i64,
        reason: String,
        idempotency_key: String,
        tool_id: Option<ToolId>,
    ) -> Self {
        Self {
            entry_id: EntryId::generate(),
            account_id,
            direction: Direction::Debit,
            amount,
            balance_after,
            reason,
            tool_id,
            idempotency_key,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// The signed effect of this entry on the balance.
    ///
    /// Credits are positive, debits negative.
    #[must_use]
    pub const fn signed_amount(&self) -> i64 {
        match self.direction {
            Direction::Credit => self.amount,
            Direction::Debit => -self.amount,
        }
    }
}

/// Result of a successful (or replayed) consume/grant operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    /// The balance after the operation.
    pub balance_after: i64,

    /// The entry written by the original operation.
    pub entry_id: EntryId,

    /// True when the idempotency key had already been processed and the
    /// stored result was returned instead of re-applying the effect.
    pub is_duplicate: bool,
}

/// Durable record that an idempotency key has been processed.
///
/// Stored in the same atomic batch as the ledger entry it refers to, so a
/// replayed request can return the original result without side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    /// The caller-supplied key.
    pub key: String,

    /// The account the original operation applied to.
    pub account_id: AccountId,

    /// The entry the original operation wrote.
    pub entry_id: EntryId,

    /// The balance after the original operation.
    pub balance_after: i64,

    /// When the original operation committed.
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Build the record for a freshly written entry.
    #[must_use]
    pub fn for_entry(entry: &LedgerEntry) -> Self {
        Self {
            key: entry.idempotency_key.clone(),
            account_id: entry.account_id,
            entry_id: entry.entry_id,
            balance_after: entry.balance_after,
            created_at: entry.created_at,
        }
    }

    /// The outcome to return on replay.
    #[must_use]
    pub const fn replay_outcome(&self) -> ApplyOutcome {
        ApplyOutcome {
            balance_after: self.balance_after,
            entry_id: self.entry_id,
            is_duplicate: true,
        }
    }
}
