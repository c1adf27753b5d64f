//! Webhook transport.
//!
//! [`WebhookSender`] is the seam between the delivery pipeline and the
//! network; tests swap in a fake, production uses [`HttpSender`].

use std::time::Duration;

use async_trait::async_trait;

use tollgate_core::WebhookEvent;

use crate::error::DeliveryError;
use crate::sign::{sign_payload_now, SIGNATURE_HEADER};

/// Default per-request timeout for delivery attempts.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A transport capable of delivering one webhook event.
#[async_trait]
pub trait WebhookSender: Send + Sync {
    /// Deliver `event` to its target URL.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] when the endpoint is unreachable or
    /// answers with a non-2xx status.
    async fn deliver(&self, event: &WebhookEvent) -> Result<(), DeliveryError>;
}

/// HTTP delivery via `reqwest`.
pub struct HttpSender {
    http: reqwest::Client,
}

impl HttpSender {
    /// Create a sender with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new() -> Result<Self, DeliveryError> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a sender with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl WebhookSender for HttpSender {
    async fn deliver(&self, event: &WebhookEvent) -> Result<(), DeliveryError> {
        let body = event.envelope().to_string();
        let signature = sign_payload_now(&event.secret, &body);

        let response = self
            .http
            .post(&event.target_url)
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}
