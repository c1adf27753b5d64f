//! Webhook queue administration handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use tollgate_core::{WebhookEvent, WebhookEventId};
use tollgate_store::Store;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Default number of dead-lettered events returned.
const DEFAULT_DEAD_LETTER_LIMIT: usize = 50;

/// Dead-letter listing parameters.
#[derive(Debug, Deserialize)]
pub struct DeadLetterQuery {
    /// Maximum events to return (default 50).
    pub limit: Option<usize>,
}

/// Dead-letter listing response.
#[derive(Debug, Serialize)]
pub struct DeadLetterResponse {
    /// Dead-lettered events, newest first.
    pub events: Vec<WebhookEvent>,
}

/// List dead-lettered webhook events for inspection.
pub async fn list_dead_letters(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Query(query): Query<DeadLetterQuery>,
) -> Result<Json<DeadLetterResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_DEAD_LETTER_LIMIT);
    let events = state.store.list_dead_letters(limit)?;
    Ok(Json(DeadLetterResponse { events }))
}

/// Get a webhook event by ID.
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(event_id): Path<String>,
) -> Result<Json<WebhookEvent>, ApiError> {
    let event_id = parse_event_id(&event_id)?;
    let event = state
        .store
        .get_webhook(&event_id)?
        .ok_or_else(|| ApiError::NotFound(format!("webhook event not found: {event_id}")))?;
    Ok(Json(event))
}

/// Manually replay a dead-lettered webhook event.
pub async fn replay(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(event_id): Path<String>,
) -> Result<Json<WebhookEvent>, ApiError> {
    let event_id = parse_event_id(&event_id)?;
    let event = state.dispatcher.replay(&event_id).await?;

    tracing::info!(
        admin_id = %admin.admin_id,
        event_id = %event_id,
        status = ?event.status,
        "Dead-lettered webhook replayed"
    );

    Ok(Json(event))
}

fn parse_event_id(raw: &str) -> Result<WebhookEventId, ApiError> {
    raw.parse::<WebhookEventId>()
        .map_err(|_| ApiError::BadRequest("Invalid webhook event ID".into()))
}
