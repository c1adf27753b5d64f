//! Webhook event types and the delivery state machine.
//!
//! A `WebhookEvent` records one notification attempt series. Status
//! transitions are monotonic: `pending`/`retrying` may move to `succeeded`
//! or `dead_letter` (both terminal); nothing moves out of a terminal state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{ToolId, WebhookEventId};

/// Maximum delivery attempts before an event dead-letters.
pub const MAX_RETRIES: u32 = 5;

/// Base retry delay in seconds (doubles per retry).
pub const BASE_RETRY_DELAY_SECS: i64 = 60;

/// Retry delay cap in seconds (one hour).
pub const MAX_RETRY_DELAY_SECS: i64 = 3600;

/// Kind of event delivered to vendor tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Credits were consumed from an account.
    #[serde(rename = "credits.consumed")]
    CreditsConsumed,

    /// Credits were granted to an account.
    #[serde(rename = "credits.granted")]
    CreditsGranted,
}

impl EventKind {
    /// The wire name of the event type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreditsConsumed => "credits.consumed",
            Self::CreditsGranted => "credits.granted",
        }
    }
}

/// Delivery status of a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    /// Waiting for (re-)delivery.
    Pending,

    /// Claimed by a sweep worker; a delivery attempt is in flight.
    Retrying,

    /// Delivered (2xx response). Terminal.
    Succeeded,

    /// All retries exhausted. Terminal; retained for manual replay.
    DeadLetter,
}

impl WebhookStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::DeadLetter)
    }
}

/// One notification attempt series towards a vendor endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Unique event ID. Vendors deduplicate on it; delivery is at-least-once.
    pub event_id: WebhookEventId,

    /// The tool this event is addressed to.
    pub tool_id: ToolId,

    /// Event kind (`credits.consumed`, ...).
    pub kind: EventKind,

    /// Event-specific payload, carried under `data` on the wire.
    pub payload: serde_json::Value,

    /// The vendor-configured endpoint URL.
    pub target_url: String,

    /// The per-tool signing secret.
    pub secret: String,

    /// Current delivery status.
    pub status: WebhookStatus,

    /// Number of failed attempts so far.
    pub retry_count: u32,

    /// Attempts allowed before dead-lettering.
    pub max_retries: u32,

    /// When the next attempt is due. `None` once terminal.
    pub next_retry_at: Option<DateTime<Utc>>,

    /// The last delivery error, if any.
    pub last_error: Option<String>,

    /// When the event was created.
    pub created_at: DateTime<Utc>,

    /// When the event was delivered, if it succeeded.
    pub delivered_at: Option<DateTime<Utc>>,
}

impl WebhookEvent {
    /// Create a new pending event, due immediately.
    #[must_use]
    pub fn new(
        tool_id: ToolId,
        kind: EventKind,
        payload: serde_json::Value,
        target_url: String,
        secret: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            event_id: WebhookEventId::generate(),
            tool_id,
            kind,
            payload,
            target_url,
            secret,
            status: WebhookStatus::Pending,
            retry_count: 0,
            max_retries: MAX_RETRIES,
            next_retry_at: Some(now),
            last_error: None,
            created_at: now,
            delivered_at: None,
        }
    }

    /// The envelope POSTed to the vendor: `{id, type, created, data}`.
    #[must_use]
    pub fn envelope(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.event_id,
            "type": self.kind.as_str(),
            "created": self.created_at.timestamp(),
            "data": self.payload,
        })
    }

    /// Delay before the n-th retry: `min(60 * 2^n, 3600)` seconds.
    #[must_use]
    pub fn retry_delay(retry_count: u32) -> Duration {
        let exp = retry_count.min(31);
        let secs = BASE_RETRY_DELAY_SECS
            .saturating_mul(1_i64 << exp)
            .min(MAX_RETRY_DELAY_SECS);
        Duration::seconds(secs)
    }

    /// Whether the event is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the event is due for a delivery attempt at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == WebhookStatus::Pending
            && self.next_retry_at.is_some_and(|at| at <= now)
    }

    /// Claim the event for a delivery attempt (`pending -> retrying`).
    ///
    /// The transition acts as a lease: a claimed event is invisible to
    /// other sweepers until the attempt resolves it.
    pub fn claim(&mut self) {
        self.status = WebhookStatus::Retrying;
    }

    /// Record a successful delivery. Terminal.
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.status = WebhookStatus::Succeeded;
        self.next_retry_at = None;
        self.delivered_at = Some(now);
    }

    /// Record a failed delivery attempt.
    ///
    /// Schedules the next retry with exponential backoff, or dead-letters
    /// the event once `max_retries` attempts have failed.
    pub fn record_failure(&mut self, error: String, now: DateTime<Utc>) {
        self.last_error = Some(error);
        if self.retry_count >= self.max_retries {
            self.status = WebhookStatus::DeadLetter;
            self.next_retry_at = None;
        } else {
            self.next_retry_at = Some(now + Self::retry_delay(self.retry_count));
            self.retry_count += 1;
            self.status = WebhookStatus::Pending;
        }
    }

    /// Reset a dead-lettered event for manual replay.
    ///
    /// No automatic resurrection: this is only reachable through the admin
    /// replay operation.
    pub fn reset_for_replay(&mut self, now: DateTime<Utc>) {
        self.status = WebhookStatus::Pending;
        self.retry_count = 0;
        self.next_retry_at = Some(now);
        self.last_error = None;
    }
}
