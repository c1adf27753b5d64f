//! Signed webhook delivery for the tollgate credit ledger.
//!
//! Events enqueued by the ledger are POSTed to vendor endpoints with an
//! `x-tollgate-signature` header. Failed deliveries back off exponentially
//! (60s doubling, capped at one hour) for up to five retries, then
//! dead-letter for manual replay.
//!
//! The crate also exports the verification half of the signature scheme so
//! receivers can validate deliveries with the same code that produces them.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod dispatch;
pub mod error;
pub mod sender;
pub mod sign;

pub use dispatch::{Dispatcher, SweepWorker, DEFAULT_SWEEP_BATCH, DEFAULT_SWEEP_INTERVAL};
pub use error::DeliveryError;
pub use sender::{HttpSender, WebhookSender, DEFAULT_REQUEST_TIMEOUT};
pub use sign::{
    parse_signature_header, sign_payload, sign_payload_now, verify_signature,
    DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER,
};
