//! Request and response types for the tollgate API.

use serde::{Deserialize, Serialize};

use tollgate_core::LedgerEntry;

/// Consume request.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumeRequest {
    /// The account to debit.
    pub account_id: String,
    /// Credits to consume (positive).
    pub amount: i64,
    /// Short human-readable reason.
    pub reason: String,
    /// Caller-supplied key for safe retries.
    pub idempotency_key: String,
    /// The tool performing the consumption (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
}

/// Grant request.
#[derive(Debug, Clone, Serialize)]
pub struct GrantRequest {
    /// The account to credit.
    pub account_id: String,
    /// Credits to grant (positive).
    pub amount: i64,
    /// Short human-readable reason.
    pub reason: String,
    /// Caller-supplied key for safe retries.
    pub idempotency_key: String,
    /// Open metadata bag for audit context.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Outcome of a consume or grant.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationResponse {
    /// Balance after the operation.
    pub balance: i64,
    /// The ledger entry recording the operation.
    pub entry_id: String,
    /// Whether this request replayed a previously applied operation.
    pub duplicate: bool,
}

/// Outcome of [`try_consume`](crate::TollgateClient::try_consume).
///
/// Running out of credits is an expected condition for callers that meter
/// usage, so it is not an `Err`.
#[derive(Debug, Clone)]
pub enum ConsumeOutcome {
    /// The debit was applied (or replayed).
    Applied(OperationResponse),
    /// The debit would breach the overdraft floor.
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
        /// Credits missing to cover the debit.
        shortfall: i64,
    },
}

/// Balance response.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// The account ID.
    pub account_id: String,
    /// Current materialized balance.
    pub balance: i64,
    /// Overdraft allowance.
    pub overdraft_limit: i64,
    /// The lowest balance the account may reach.
    pub floor: i64,
}

/// Ledger history response.
#[derive(Debug, Clone, Deserialize)]
pub struct EntriesResponse {
    /// Entries, newest first.
    pub entries: Vec<LedgerEntry>,
    /// Whether more entries exist beyond this page.
    pub has_more: bool,
}

/// Error response body from the API.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    /// The error payload.
    pub error: ApiErrorBody,
}

/// Error payload.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Error-specific details.
    pub details: Option<serde_json::Value>,
}
