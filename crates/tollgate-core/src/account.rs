//! Account types for the tollgate ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// An account eligible to hold credits.
///
/// The account itself does not carry the balance; the materialized balance
/// lives in its own projection, kept transactionally consistent with the
/// ledger. The account carries policy: the overdraft allowance and whether
/// the account is still active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The account ID.
    pub account_id: AccountId,

    /// Maximum amount the balance may go below zero (non-negative).
    pub overdraft_limit: i64,

    /// Whether the account accepts new operations.
    ///
    /// Accounts are never deleted, only deactivated.
    pub active: bool,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new active account with no overdraft allowance.
    #[must_use]
    pub fn new(account_id: AccountId) -> Self {
        let now = Utc::now();
        Self {
            account_id,
            overdraft_limit: 0,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new active account with the given overdraft allowance.
    #[must_use]
    pub fn with_overdraft_limit(account_id: AccountId, overdraft_limit: i64) -> Self {
        let mut account = Self::new(account_id);
        account.overdraft_limit = overdraft_limit.max(0);
        account
    }

    /// The lowest balance this account may reach.
    #[must_use]
    pub const fn floor(&self) -> i64 {
        -self.overdraft_limit
    }

    /// Check whether a debit of `amount` is allowed at the given balance.
    #[must_use]
    pub const fn can_debit(&self, balance: i64, amount: i64) -> bool {
        balance - amount >= self.floor()
    }

    /// Credits missing for a debit of `amount` at the given balance.
    ///
    /// Zero when the debit is allowed. Accounts for the overdraft allowance.
    #[must_use]
    pub const fn shortfall(&self, balance: i64, amount: i64) -> i64 {
        let missing = amount - (balance + self.overdraft_limit);
        if missing > 0 {
            missing
        } else {
            0
        }
    }

    /// Deactivate the account.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }
}
