//! Error types for tollgate storage.

use tollgate_core::LedgerError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed. Surfaced to callers as a generic failure.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record ("account", "entry", "webhook event").
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// Account exists but has been deactivated.
    #[error("account inactive: {account_id}")]
    AccountInactive {
        /// The deactivated account ID.
        account_id: String,
    },

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

    /// Timed out waiting for the account's row lock.
    ///
    /// The outcome of the original attempt is unknown to the caller; retry
    /// with the same idempotency key.
    #[error("timed out waiting for account lock: {account_id}")]
    LockTimeout {
        /// The contended account ID.
        account_id: String,
    },

    /// Malformed input; caller-fixable, never retried automatically.
    #[error("validation error: {0}")]
    Validation(String),
}

impl From<LedgerError> for StoreError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientCredits {
                balance,
                required,
                shortfall,
            } => Self::InsufficientCredits {
                balance,
                required,
                shortfall,
            },
            LedgerError::AccountNotFound { account_id } => Self::NotFound {
                entity: "account",
                id: account_id,
            },
            LedgerError::AccountInactive { account_id } => Self::AccountInactive { account_id },
            LedgerError::Validation(msg) => Self::Validation(msg),
        }
    }
}
