//! Per-account lock table.
//!
//! Consume/grant operations against the same account must serialize; the
//! balance row is the only mutable shared resource. Operations against
//! different accounts never contend, so each account gets its own mutex,
//! created lazily on first use.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;

use tollgate_core::AccountId;

/// Default time to wait for an account lock before reporting a timeout.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Lazily-populated map of per-account mutexes.
#[derive(Default)]
pub struct AccountLocks {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl AccountLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the mutex for an account.
    ///
    /// The returned `Arc` outlives the map shard lock, so callers block on
    /// the account mutex only, never on the table itself.
    #[must_use]
    pub fn handle(&self, account_id: &AccountId) -> Arc<Mutex<()>> {
        self.locks
            .entry(*account_id)
            .or_default()
            .clone()
    }
}
