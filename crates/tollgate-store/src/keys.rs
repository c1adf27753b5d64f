//! Key encoding utilities for `RocksDB`.

use chrono::{DateTime, Utc};

use tollgate_core::{AccountId, EntryId, WebhookEventId};

/// Create an account key from an account ID.
#[must_use]
pub fn account_key(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Create a balance key from an account ID.
#[must_use]
pub fn balance_key(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Create an entry key from an entry ID.
#[must_use]
pub fn entry_key(entry_id: &EntryId) -> Vec<u8> {
    entry_id.to_bytes().to_vec()
}

/// Create an account-entry index key.
///
/// Format: `account_id (16 bytes) || entry_id (16 bytes)`
///
/// Since ULIDs are time-ordered, an account's entries sort chronologically.
#[must_use]
pub fn account_entry_key(account_id: &AccountId, entry_id: &EntryId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(account_id.as_bytes());
    key.extend_from_slice(&entry_id.to_bytes());
    key
}

/// Create a prefix for iterating all entries for an account.
#[must_use]
pub fn account_entries_prefix(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Extract the entry ID from an account-entry index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_entry_id_from_account_key(key: &[u8]) -> EntryId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    EntryId::from_bytes(bytes).expect("valid ULID bytes")
}

/// Create an idempotency key from the raw caller-supplied string.
#[must_use]
pub fn idempotency_key(key: &str) -> Vec<u8> {
    key.as_bytes().to_vec()
}

/// Create a webhook event key from an event ID.
#[must_use]
pub fn webhook_key(event_id: &WebhookEventId) -> Vec<u8> {
    event_id.as_bytes().to_vec()
}

/// Create a webhook due-index key.
///
/// Format: `due_millis (8 bytes big-endian) || event_id (16 bytes)`, so the
/// index iterates in due-time order.
#[must_use]
pub fn webhook_due_key(due_at: DateTime<Utc>, event_id: &WebhookEventId) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    #[allow(clippy::cast_sign_loss)]
    let millis = due_at.timestamp_millis().max(0) as u64;
    key.extend_from_slice(&millis.to_be_bytes());
    key.extend_from_slice(event_id.as_bytes());
    key
}

/// Extract the due time (millis) and event ID from a due-index key.
///
/// # Panics
///
/// Panics if the key is not at least 24 bytes.
#[must_use]
pub fn extract_webhook_due_key(key: &[u8]) -> (u64, WebhookEventId) {
    let mut millis = [0u8; 8];
    millis.copy_from_slice(&key[..8]);
    let mut id = [0u8; 16];
    id.copy_from_slice(&key[8..24]);
    (
        u64::from_be_bytes(millis),
        WebhookEventId::from_uuid(uuid::Uuid::from_bytes(id)),
    )
}
