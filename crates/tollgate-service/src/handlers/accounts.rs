//! Account administration handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tollgate_core::{Account, AccountId};
use tollgate_store::Store;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Account creation request.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Account ID to register. Generated when omitted.
    pub account_id: Option<String>,
    /// Overdraft allowance (non-negative, default 0).
    #[serde(default)]
    pub overdraft_limit: i64,
}

/// Account representation returned by the API.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// The account ID.
    pub account_id: AccountId,
    /// Overdraft allowance.
    pub overdraft_limit: i64,
    /// Whether the account accepts operations.
    pub active: bool,
    /// Current materialized balance.
    pub balance: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl AccountResponse {
    fn from_account(account: Account, balance: i64) -> Self {
        Self {
            account_id: account.account_id,
            overdraft_limit: account.overdraft_limit,
            active: account.active,
            balance,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Create (register) an account.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    if body.overdraft_limit < 0 {
        return Err(ApiError::BadRequest(
            "overdraft_limit must be non-negative".into(),
        ));
    }

    let account_id = match &body.account_id {
        Some(raw) => raw
            .parse::<AccountId>()
            .map_err(|_| ApiError::BadRequest("Invalid account ID".into()))?,
        None => AccountId::generate(),
    };

    if state.store.get_account(&account_id)?.is_some() {
        return Err(ApiError::Conflict(format!(
            "account already exists: {account_id}"
        )));
    }

    let account = Account::with_overdraft_limit(account_id, body.overdraft_limit);
    state.store.put_account(&account)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        account_id = %account_id,
        overdraft_limit = account.overdraft_limit,
        "Account created"
    );

    Ok(Json(AccountResponse::from_account(account, 0)))
}

/// Get an account with its current balance.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(account_id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account_id = account_id
        .parse::<AccountId>()
        .map_err(|_| ApiError::BadRequest("Invalid account ID".into()))?;

    let account = state
        .store
        .get_account(&account_id)?
        .ok_or_else(|| ApiError::NotFound(format!("account not found: {account_id}")))?;
    let balance = state.store.balance(&account_id)?;

    Ok(Json(AccountResponse::from_account(account, balance)))
}

/// Deactivate an account. The ledger history is retained.
pub async fn deactivate_account(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(account_id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account_id = account_id
        .parse::<AccountId>()
        .map_err(|_| ApiError::BadRequest("Invalid account ID".into()))?;

    let account = state.store.deactivate_account(&account_id)?;
    let balance = state.store.balance(&account_id)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        account_id = %account_id,
        "Account deactivated"
    );

    Ok(Json(AccountResponse::from_account(account, balance)))
}
