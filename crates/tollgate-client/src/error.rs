//! Client error types.

/// Errors that can occur when using the tollgate client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// Insufficient credits for the requested consumption.
    #[error("insufficient credits: balance={balance}, required={required}, shortfall={shortfall}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
        /// Credits missing to cover the debit.
        shortfall: i64,
    },

    /// The service timed out waiting for the account's lock.
    ///
    /// The outcome is unknown; retry with the same idempotency key.
    #[error("operation timed out on the server: {0}")]
    ConcurrencyTimeout(String),

    /// Account not found.
    #[error("account not found: {account_id}")]
    AccountNotFound {
        /// The account ID.
        account_id: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
