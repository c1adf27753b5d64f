//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Account policy records, keyed by `account_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Materialized balance projection, keyed by `account_id`.
    ///
    /// Written only in the same batch as the ledger entry it reflects.
    pub const BALANCES: &str = "balances";

    /// Append-only ledger entries, keyed by `entry_id` (ULID).
    pub const ENTRIES: &str = "entries";

    /// Index: entries by account, keyed by `account_id || entry_id`.
    /// Value is empty (index only).
    pub const ENTRIES_BY_ACCOUNT: &str = "entries_by_account";

    /// Idempotency records, keyed by the raw caller-supplied key.
    pub const IDEMPOTENCY: &str = "idempotency";

    /// Webhook events, keyed by `event_id`.
    pub const WEBHOOKS: &str = "webhooks";

    /// Index: pending webhook events by due time, keyed by
    /// `next_retry_at_millis (8 bytes BE) || event_id`. Value is empty.
    pub const WEBHOOKS_DUE: &str = "webhooks_due";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::BALANCES,
        cf::ENTRIES,
        cf::ENTRIES_BY_ACCOUNT,
        cf::IDEMPOTENCY,
        cf::WEBHOOKS,
        cf::WEBHOOKS_DUE,
    ]
}
