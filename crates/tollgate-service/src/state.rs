//! Application state.

use std::sync::Arc;

use tollgate_core::{EventKind, ToolId, WebhookEvent};
use tollgate_store::RocksStore;
use tollgate_webhook::{Dispatcher, HttpSender};

use crate::config::ServiceConfig;

/// Configured webhook delivery target.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    /// Tool identity stamped on events that don't carry their own.
    pub tool_id: ToolId,
    /// Endpoint URL deliveries are POSTed to.
    pub url: String,
    /// Signing secret for deliveries.
    pub secret: String,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// The webhook delivery pipeline.
    pub dispatcher: Arc<Dispatcher>,

    /// Webhook target, if configured.
    pub webhook_sink: Option<WebhookSink>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client for webhook delivery cannot be built,
    /// which only happens when the TLS backend is unavailable.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let sender = Arc::new(HttpSender::new().expect("failed to build webhook HTTP client"));
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), sender));

        let webhook_sink = config
            .webhook_url
            .as_ref()
            .zip(config.webhook_secret.as_ref())
            .map(|(url, secret)| {
                tracing::info!(webhook_url = %url, "Webhook delivery enabled");
                WebhookSink {
                    tool_id: ToolId::generate(),
                    url: url.clone(),
                    secret: secret.clone(),
                }
            });

        if webhook_sink.is_none() {
            tracing::warn!("Webhook target not configured - events will not be delivered");
        }

        Self {
            store,
            config,
            dispatcher,
            webhook_sink,
        }
    }

    /// Enqueue and dispatch a webhook event if a target is configured.
    ///
    /// Delivery runs on a spawned task; ledger responses never wait on the
    /// vendor endpoint.
    pub fn emit_webhook(&self, kind: EventKind, tool_id: Option<ToolId>, payload: serde_json::Value) {
        let Some(sink) = &self.webhook_sink else {
            return;
        };

        let event = WebhookEvent::new(
            tool_id.unwrap_or(sink.tool_id),
            kind,
            payload,
            sink.url.clone(),
            sink.secret.clone(),
        );

        let dispatcher = self.dispatcher.clone();
        let event_id = event.event_id;
        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch(event).await {
                tracing::error!(event_id = %event_id, error = %e, "Failed to enqueue webhook event");
            }
        });
    }
}
