//! Event dispatch and the retry sweep.
//!
//! [`Dispatcher`] owns the delivery pipeline: it persists events, runs
//! delivery attempts, and records outcomes on the queue. [`SweepWorker`]
//! drives it on an interval, picking up events whose backoff has elapsed.
//!
//! Delivery is at-least-once. An attempt that lands but whose response is
//! lost will be retried; receivers deduplicate on the event ID.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use tollgate_core::{WebhookEvent, WebhookEventId, WebhookStatus};
use tollgate_store::{Result, Store, StoreError};

use crate::sender::WebhookSender;

/// Default interval between retry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15);

/// Default number of due events claimed per sweep pass.
pub const DEFAULT_SWEEP_BATCH: usize = 32;

/// The webhook delivery pipeline.
pub struct Dispatcher {
    store: Arc<dyn Store>,
    sender: Arc<dyn WebhookSender>,
}

impl Dispatcher {
    /// Create a dispatcher over a store and a transport.
    pub fn new(store: Arc<dyn Store>, sender: Arc<dyn WebhookSender>) -> Self {
        Self { store, sender }
    }

    /// Enqueue a freshly created event and run one immediate attempt.
    ///
    /// The event is persisted pending and due-now before the attempt, so a
    /// crash mid-flight leaves it where the sweep will reclaim it. A sweep
    /// racing the first attempt can double-deliver; receivers deduplicate
    /// on the event ID. Failures are recorded on the event, not surfaced
    /// to the ledger caller.
    ///
    /// # Errors
    ///
    /// Returns an error only when the queue itself cannot be written.
    pub async fn dispatch(&self, event: WebhookEvent) -> Result<()> {
        self.store.put_webhook(&event)?;
        self.attempt(event).await
    }

    /// Run one sweep pass: claim due events and attempt each.
    ///
    /// A failure to record one event's outcome does not abandon the rest
    /// of the batch. Returns the number of events attempted.
    ///
    /// # Errors
    ///
    /// Returns an error when the due queue cannot be read.
    pub async fn sweep_once(&self) -> Result<usize> {
        let due = self
            .store
            .claim_due_webhooks(Utc::now(), DEFAULT_SWEEP_BATCH)?;
        let count = due.len();
        for event in due {
            let event_id = event.event_id;
            if let Err(err) = self.attempt(event).await {
                tracing::error!(
                    event_id = %event_id,
                    error = %err,
                    "failed to record webhook delivery outcome"
                );
            }
        }
        Ok(count)
    }

    /// Manually replay a dead-lettered event.
    ///
    /// Resets the retry budget and runs one immediate attempt. This is the
    /// only path out of `dead_letter`.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the event doesn't exist.
    /// - `StoreError::Validation` if the event isn't dead-lettered.
    pub async fn replay(&self, event_id: &WebhookEventId) -> Result<WebhookEvent> {
        let mut event = self
            .store
            .get_webhook(event_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "webhook_event",
                id: event_id.to_string(),
            })?;

        if event.status != WebhookStatus::DeadLetter {
            return Err(StoreError::Validation(format!(
                "event {event_id} is not dead-lettered"
            )));
        }

        event.reset_for_replay(Utc::now());
        self.store.put_webhook(&event)?;
        self.attempt(event).await?;

        self.store
            .get_webhook(event_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "webhook_event",
                id: event_id.to_string(),
            })
    }

    /// Run one delivery attempt for an event and persist the outcome.
    async fn attempt(&self, mut event: WebhookEvent) -> Result<()> {
        match self.sender.deliver(&event).await {
            Ok(()) => {
                event.record_success(Utc::now());
                tracing::info!(
                    event_id = %event.event_id,
                    kind = event.kind.as_str(),
                    "webhook delivered"
                );
            }
            Err(err) => {
                event.record_failure(err.to_string(), Utc::now());
                match event.status {
                    WebhookStatus::DeadLetter => tracing::error!(
                        event_id = %event.event_id,
                        kind = event.kind.as_str(),
                        error = %err,
                        "webhook dead-lettered after exhausting retries"
                    ),
                    _ => tracing::warn!(
                        event_id = %event.event_id,
                        kind = event.kind.as_str(),
                        retry_count = event.retry_count,
                        error = %err,
                        "webhook delivery failed, retry scheduled"
                    ),
                }
            }
        }
        self.store.put_webhook(&event)
    }
}

/// Background task that sweeps the queue on an interval.
pub struct SweepWorker {
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
}

impl SweepWorker {
    /// Create a worker with the default sweep interval.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self::with_interval(dispatcher, DEFAULT_SWEEP_INTERVAL)
    }

    /// Create a worker with an explicit sweep interval.
    pub fn with_interval(dispatcher: Arc<Dispatcher>, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
        }
    }

    /// Run the sweep loop forever. Intended to be spawned as a task.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.dispatcher.sweep_once().await {
                Ok(0) => {}
                Ok(count) => tracing::debug!(count, "webhook sweep attempted events"),
                Err(err) => tracing::error!(error = %err, "webhook sweep failed"),
            }
        }
    }
}
