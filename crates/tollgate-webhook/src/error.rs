//! Delivery pipeline error types.

use thiserror::Error;

/// A failed delivery attempt.
///
/// Both variants are retryable; the distinction only matters for the
/// `last_error` text recorded on the event.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The request never completed (connect failure, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-2xx status.
    #[error("endpoint returned status {0}")]
    Status(u16),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
