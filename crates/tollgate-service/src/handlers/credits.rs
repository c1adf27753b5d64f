//! Credit grant, consumption, and ledger read handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use tollgate_core::{AccountId, EntryId, EventKind, LedgerEntry, ToolId};
use tollgate_store::{ConsumeOp, GrantOp, Store};

use crate::auth::{AdminAuth, ToolAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Default page size for ledger history.
const DEFAULT_PAGE_SIZE: usize = 50;

/// Maximum page size for ledger history.
const MAX_PAGE_SIZE: usize = 500;

/// Consume request from a vendor tool.
#[derive(Debug, Deserialize)]
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
    pub tool_id: Option<String>,
}

/// Grant request from an operator.
#[derive(Debug, Deserialize)]
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
#[derive(Debug, Serialize)]
pub struct OperationResponse {
    /// Balance after the operation.
    pub balance: i64,
    /// The ledger entry recording the operation.
    pub entry_id: EntryId,
    /// Whether this request replayed a previously applied operation.
    pub duplicate: bool,
}

/// Consume credits from an account.
pub async fn consume(
    State(state): State<Arc<AppState>>,
    auth: ToolAuth,
    Json(body): Json<ConsumeRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let account_id = parse_account_id(&body.account_id)?;
    let tool_id = body
        .tool_id
        .as_deref()
        .map(str::parse::<ToolId>)
        .transpose()
        .map_err(|_| ApiError::BadRequest("Invalid tool ID".into()))?;

    let op = ConsumeOp {
        account_id,
        amount: body.amount,
        reason: body.reason.clone(),
        idempotency_key: body.idempotency_key.clone(),
        tool_id,
    };

    let outcome = state.store.consume(&op)?;

    tracing::info!(
        tool = %auth.tool_name,
        account_id = %account_id,
        amount = body.amount,
        balance = outcome.balance_after,
        duplicate = outcome.is_duplicate,
        "Credits consumed"
    );

    if !outcome.is_duplicate {
        state.emit_webhook(
            EventKind::CreditsConsumed,
            tool_id,
            serde_json::json!({
                "account_id": account_id,
                "entry_id": outcome.entry_id,
                "amount": body.amount,
                "balance_after": outcome.balance_after,
                "reason": body.reason,
                "tool_id": tool_id,
                "idempotency_key": body.idempotency_key,
            }),
        );
    }

    Ok(Json(OperationResponse {
        balance: outcome.balance_after,
        entry_id: outcome.entry_id,
        duplicate: outcome.is_duplicate,
    }))
}

/// Grant credits to an account.
pub async fn grant(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<GrantRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let account_id = parse_account_id(&body.account_id)?;

    let op = GrantOp {
        account_id,
        amount: body.amount,
        reason: body.reason.clone(),
        idempotency_key: body.idempotency_key.clone(),
        metadata: body.metadata,
    };

    let outcome = state.store.grant(&op)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        account_id = %account_id,
        amount = body.amount,
        balance = outcome.balance_after,
        duplicate = outcome.is_duplicate,
        "Credits granted"
    );

    if !outcome.is_duplicate {
        state.emit_webhook(
            EventKind::CreditsGranted,
            None,
            serde_json::json!({
                "account_id": account_id,
                "entry_id": outcome.entry_id,
                "amount": body.amount,
                "balance_after": outcome.balance_after,
                "reason": body.reason,
                "idempotency_key": body.idempotency_key,
            }),
        );
    }

    Ok(Json(OperationResponse {
        balance: outcome.balance_after,
        entry_id: outcome.entry_id,
        duplicate: outcome.is_duplicate,
    }))
}

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// The account.
    pub account_id: AccountId,
    /// Current materialized balance.
    pub balance: i64,
    /// Overdraft allowance.
    pub overdraft_limit: i64,
    /// The lowest balance the account may reach.
    pub floor: i64,
}

/// Get an account's current balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    _auth: ToolAuth,
    Path(account_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account_id = parse_account_id(&account_id)?;

    let account = state
        .store
        .get_account(&account_id)?
        .ok_or_else(|| ApiError::NotFound(format!("account not found: {account_id}")))?;
    let balance = state.store.balance(&account_id)?;

    Ok(Json(BalanceResponse {
        account_id,
        balance,
        overdraft_limit: account.overdraft_limit,
        floor: account.floor(),
    }))
}

/// Ledger history pagination parameters.
#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    /// Page size (default 50, max 500).
    pub limit: Option<usize>,
    /// Entries to skip from the newest.
    pub offset: Option<usize>,
}

/// Ledger history response.
#[derive(Debug, Serialize)]
pub struct EntriesResponse {
    /// Entries, newest first.
    pub entries: Vec<LedgerEntry>,
    /// Whether more entries exist beyond this page.
    pub has_more: bool,
}

/// List an account's ledger entries, newest first.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    _auth: ToolAuth,
    Path(account_id): Path<String>,
    Query(query): Query<EntriesQuery>,
) -> Result<Json<EntriesResponse>, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    if state.store.get_account(&account_id)?.is_none() {
        return Err(ApiError::NotFound(format!(
            "account not found: {account_id}"
        )));
    }

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    // Fetch one past the page to detect whether more entries remain.
    let mut entries = state.store.list_entries(&account_id, limit + 1, offset)?;
    let has_more = entries.len() > limit;
    entries.truncate(limit);

    Ok(Json(EntriesResponse { entries, has_more }))
}

fn parse_account_id(raw: &str) -> Result<AccountId, ApiError> {
    raw.parse::<AccountId>()
        .map_err(|_| ApiError::BadRequest("Invalid account ID".into()))
}
