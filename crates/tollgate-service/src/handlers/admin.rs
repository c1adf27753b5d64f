//! Reconciliation handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use tollgate_store::{BalanceMismatch, Store};

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Reconciliation result.
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    /// Whether every materialized balance matched its ledger sum.
    pub consistent: bool,
    /// Accounts whose materialized balance diverged from the ledger.
    pub mismatches: Vec<BalanceMismatch>,
}

/// Recompute all balances from the ledger and report divergences.
///
/// Mismatches are reported, never silently corrected.
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let mismatches = state.store.reconcile()?;

    tracing::info!(
        admin_id = %admin.admin_id,
        mismatches = mismatches.len(),
        "Reconciliation run"
    );

    Ok(Json(ReconcileResponse {
        consistent: mismatches.is_empty(),
        mismatches,
    }))
}
