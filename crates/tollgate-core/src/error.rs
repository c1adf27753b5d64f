//! Error types for the tollgate ledger.

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Insufficient credits for the debit, accounting for overdraft.
    #[error("insufficient credits: balance={balance}, required={required}, shortfall={shortfall}")]
    InsufficientCredits {
        /// Current materialized balance.
        balance: i64,
        /// Amount the operation required.
        required: i64,
        /// Credits missing after the overdraft allowance.
        shortfall: i64,
    },

    /// Account not found.
    #[error("account not found: {account_id}")]
    AccountNotFound {
        /// The account ID that was not found.
        account_id: String,
    },

    /// Account exists but has been deactivated.
    #[error("account inactive: {account_id}")]
    AccountInactive {
        /// The deactivated account ID.
        account_id: String,
    },

    /// Malformed input; caller-fixable, never retried automatically.
    #[error("validation error: {0}")]
    Validation(String),
}
