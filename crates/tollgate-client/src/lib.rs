//! Tollgate Client SDK.
//!
//! This crate provides a client library for vendor tools to interact with
//! the tollgate credit ledger API.
//!
//! # Example
//!
//! ```no_run
//! use tollgate_client::{generate_idempotency_key, ConsumeOutcome, ConsumeRequest, TollgateClient};
//!
//! # async fn example() -> Result<(), tollgate_client::ClientError> {
//! let client = TollgateClient::new(
//!     "http://tollgate.billing.svc:8080",
//!     "your-tool-api-key",
//! );
//!
//! let outcome = client
//!     .try_consume(ConsumeRequest {
//!         account_id: "7b4b0a0e-2a1f-4d55-9c58-6a4e2c9b1f10".into(),
//!         amount: 30,
//!         reason: "pdf export".into(),
//!         idempotency_key: generate_idempotency_key(&["pdf-export", "job-42"]),
//!         tool_id: None,
//!     })
//!     .await?;
//!
//! match outcome {
//!     ConsumeOutcome::Applied(op) => println!("Balance: {} credits", op.balance),
//!     ConsumeOutcome::InsufficientCredits { shortfall, .. } => {
//!         println!("Need {shortfall} more credits");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;
mod webhook;

pub use client::{generate_idempotency_key, ClientOptions, TollgateClient};
pub use error::ClientError;
pub use types::*;
pub use webhook::{verify_webhook, verify_webhook_at, DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER};
