//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store`
//! trait, including the atomic consume/grant compound operations.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use tollgate_core::{
    Account, AccountId, ApplyOutcome, EntryId, IdempotencyRecord, LedgerEntry, LedgerError,
    WebhookEvent, WebhookEventId, WebhookStatus,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::locks::{AccountLocks, DEFAULT_LOCK_TIMEOUT};
use crate::schema::{all_column_families, cf};
use crate::{BalanceMismatch, ConsumeOp, GrantOp, Store};

/// RocksDB-backed storage implementation.
///
/// Per-account serialization is provided by the in-process lock table; the
/// store itself must therefore be shared (one instance per process) rather
/// than opened once per request.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    locks: AccountLocks,
    lock_timeout: Duration,
    // Serializes claim_due_webhooks so two sweepers cannot lease the same
    // event between its read and its status write.
    sweep_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            locks: AccountLocks::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            sweep_lock: Mutex::new(()),
        })
    }

    /// Override the account-lock wait timeout.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Load the account, rejecting missing or deactivated ones.
    fn active_account(&self, account_id: &AccountId) -> Result<Account> {
        let account = self
            .get_account(account_id)?
            .ok_or_else(|| LedgerError::AccountNotFound {
                account_id: account_id.to_string(),
            })?;
        if !account.active {
            return Err(LedgerError::AccountInactive {
                account_id: account_id.to_string(),
            }
            .into());
        }
        Ok(account)
    }

    /// Read the raw materialized balance row (0 when absent).
    fn read_balance(&self, account_id: &AccountId) -> Result<i64> {
        let cf = self.cf(cf::BALANCES)?;
        self.db
            .get_cf(&cf, keys::balance_key(account_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map_or(Ok(0), |data| Self::deserialize(&data))
    }

    /// Commit a freshly built entry: ledger row, account index, balance,
    /// and idempotency record in one atomic batch.
    fn commit_entry(&self, entry: &LedgerEntry) -> Result<ApplyOutcome> {
        let cf_entries = self.cf(cf::ENTRIES)?;
        let cf_index = self.cf(cf::ENTRIES_BY_ACCOUNT)?;
        let cf_balances = self.cf(cf::BALANCES)?;
        let cf_idem = self.cf(cf::IDEMPOTENCY)?;

        let record = IdempotencyRecord::for_entry(entry);

        let entry_value = Self::serialize(entry)?;
        let balance_value = Self::serialize(&entry.balance_after)?;
        let record_value = Self::serialize(&record)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_entries, keys::entry_key(&entry.entry_id), &entry_value);
        batch.put_cf(
            &cf_index,
            keys::account_entry_key(&entry.account_id, &entry.entry_id),
            [],
        );
        batch.put_cf(
            &cf_balances,
            keys::balance_key(&entry.account_id),
            &balance_value,
        );
        batch.put_cf(
            &cf_idem,
            keys::idempotency_key(&entry.idempotency_key),
            &record_value,
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(ApplyOutcome {
            balance_after: entry.balance_after,
            entry_id: entry.entry_id,
            is_duplicate: false,
        })
    }

    /// Remove a due-index row for an event, if one exists at `due_at`.
    fn delete_due_index(
        &self,
        batch: &mut WriteBatch,
        due_at: Option<DateTime<Utc>>,
        event_id: &WebhookEventId,
    ) -> Result<()> {
        if let Some(at) = due_at {
            let cf_due = self.cf(cf::WEBHOOKS_DUE)?;
            batch.delete_cf(&cf_due, keys::webhook_due_key(at, event_id));
        }
        Ok(())
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn put_account(&self, account: &Account) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let value = Self::serialize(account)?;

        self.db
            .put_cf(&cf, keys::account_key(&account.account_id), value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;

        self.db
            .get_cf(&cf, keys::account_key(account_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn deactivate_account(&self, account_id: &AccountId) -> Result<Account> {
        let mut account = self
            .get_account(account_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "account",
                id: account_id.to_string(),
            })?;

        account.deactivate();
        self.put_account(&account)?;

        Ok(account)
    }

    // =========================================================================
    // Balance & Ledger Operations
    // =========================================================================

    fn balance(&self, account_id: &AccountId) -> Result<i64> {
        // Balance reads require the account to exist; the projection row
        // alone is not authoritative for existence.
        self.get_account(account_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "account",
                id: account_id.to_string(),
            })?;

        self.read_balance(account_id)
    }

    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>> {
        let cf = self.cf(cf::ENTRIES)?;

        self.db
            .get_cf(&cf, keys::entry_key(entry_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_entries(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let cf_index = self.cf(cf::ENTRIES_BY_ACCOUNT)?;
        let prefix = keys::account_entries_prefix(account_id);

        let iter = self.db.iterator_cf(
            &cf_index,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        // ULIDs sort chronologically, so the prefix scan yields oldest
        // first; collect then reverse for newest-first listings.
        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }
        all_keys.reverse();

        let mut entries = Vec::new();
        for key in all_keys.into_iter().skip(offset) {
            if entries.len() >= limit {
                break;
            }
            let entry_id = keys::extract_entry_id_from_account_key(&key);
            if let Some(entry) = self.get_entry(&entry_id)? {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    fn get_idempotency_record(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        let cf = self.cf(cf::IDEMPOTENCY)?;

        self.db
            .get_cf(&cf, keys::idempotency_key(key))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    fn consume(&self, op: &ConsumeOp) -> Result<ApplyOutcome> {
        tollgate_core::validate_amount(op.amount)?;
        tollgate_core::validate_reason(&op.reason)?;
        tollgate_core::validate_idempotency_key(&op.idempotency_key)?;

        let lock = self.locks.handle(&op.account_id);
        let Some(_guard) = lock.try_lock_for(self.lock_timeout) else {
            return Err(StoreError::LockTimeout {
                account_id: op.account_id.to_string(),
            });
        };

        // Replayed request: return the original result, no side effects.
        // A key first used by a different account is a caller bug, not a
        // replay; answering with the foreign outcome would report a charge
        // this account never took.
        if let Some(record) = self.get_idempotency_record(&op.idempotency_key)? {
            if record.account_id != op.account_id {
                return Err(StoreError::Validation(format!(
                    "idempotency key already used by another account: {}",
                    op.idempotency_key
                )));
            }
            return Ok(record.replay_outcome());
        }

        let account = self.active_account(&op.account_id)?;
        let balance = self.read_balance(&op.account_id)?;

        if !account.can_debit(balance, op.amount) {
            return Err(LedgerError::InsufficientCredits {
                balance,
                required: op.amount,
                shortfall: account.shortfall(balance, op.amount),
            }
            .into());
        }

        let entry = LedgerEntry::debit(
            op.account_id,
            op.amount,
            balance - op.amount,
            op.reason.clone(),
            op.idempotency_key.clone(),
            op.tool_id,
        );

        let outcome = self.commit_entry(&entry)?;

        tracing::info!(
            account_id = %op.account_id,
            entry_id = %entry.entry_id,
            amount = %op.amount,
            balance_after = %outcome.balance_after,
            "Credits consumed"
        );

        Ok(outcome)
    }

    fn grant(&self, op: &GrantOp) -> Result<ApplyOutcome> {
        tollgate_core::validate_amount(op.amount)?;
        tollgate_core::validate_reason(&op.reason)?;
        tollgate_core::validate_idempotency_key(&op.idempotency_key)?;

        let lock = self.locks.handle(&op.account_id);
        let Some(_guard) = lock.try_lock_for(self.lock_timeout) else {
            return Err(StoreError::LockTimeout {
                account_id: op.account_id.to_string(),
            });
        };

        if let Some(record) = self.get_idempotency_record(&op.idempotency_key)? {
            if record.account_id != op.account_id {
                return Err(StoreError::Validation(format!(
                    "idempotency key already used by another account: {}",
                    op.idempotency_key
                )));
            }
            return Ok(record.replay_outcome());
        }

        self.active_account(&op.account_id)?;
        let balance = self.read_balance(&op.account_id)?;

        let entry = LedgerEntry::credit(
            op.account_id,
            op.amount,
            balance + op.amount,
            op.reason.clone(),
            op.idempotency_key.clone(),
            op.metadata.clone(),
        );

        let outcome = self.commit_entry(&entry)?;

        tracing::info!(
            account_id = %op.account_id,
            entry_id = %entry.entry_id,
            amount = %op.amount,
            balance_after = %outcome.balance_after,
            "Credits granted"
        );

        Ok(outcome)
    }

    fn reconcile(&self) -> Result<Vec<BalanceMismatch>> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let mut mismatches = Vec::new();

        for item in self.db.iterator_cf(&cf_accounts, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let account: Account = Self::deserialize(&value)?;

            let cf_index = self.cf(cf::ENTRIES_BY_ACCOUNT)?;
            let prefix = keys::account_entries_prefix(&account.account_id);
            let iter = self.db.iterator_cf(
                &cf_index,
                IteratorMode::From(&prefix, rocksdb::Direction::Forward),
            );

            let mut computed = 0_i64;
            for entry_item in iter {
                let (key, _) = entry_item.map_err(|e| StoreError::Database(e.to_string()))?;
                if !key.starts_with(&prefix) {
                    break;
                }
                let entry_id = keys::extract_entry_id_from_account_key(&key);
                if let Some(entry) = self.get_entry(&entry_id)? {
                    computed += entry.signed_amount();
                }
            }

            let materialized = self.read_balance(&account.account_id)?;
            if materialized != computed {
                tracing::error!(
                    account_id = %account.account_id,
                    materialized = %materialized,
                    computed = %computed,
                    "Materialized balance diverged from ledger sum"
                );
                mismatches.push(BalanceMismatch {
                    account_id: account.account_id,
                    materialized,
                    computed,
                });
            }
        }

        Ok(mismatches)
    }

    // =========================================================================
    // Webhook Queue Operations
    // =========================================================================

    fn put_webhook(&self, event: &WebhookEvent) -> Result<()> {
        let cf_webhooks = self.cf(cf::WEBHOOKS)?;

        let mut batch = WriteBatch::default();

        // Drop the previous due-index row before writing the new state.
        if let Some(previous) = self.get_webhook(&event.event_id)? {
            self.delete_due_index(&mut batch, previous.next_retry_at, &event.event_id)?;
        }

        let value = Self::serialize(event)?;
        batch.put_cf(&cf_webhooks, keys::webhook_key(&event.event_id), &value);

        if event.status == WebhookStatus::Pending {
            if let Some(due_at) = event.next_retry_at {
                let cf_due = self.cf(cf::WEBHOOKS_DUE)?;
                batch.put_cf(&cf_due, keys::webhook_due_key(due_at, &event.event_id), []);
            }
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_webhook(&self, event_id: &WebhookEventId) -> Result<Option<WebhookEvent>> {
        let cf = self.cf(cf::WEBHOOKS)?;

        self.db
            .get_cf(&cf, keys::webhook_key(event_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn claim_due_webhooks(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<WebhookEvent>> {
        let _sweep = self.sweep_lock.lock();

        let cf_due = self.cf(cf::WEBHOOKS_DUE)?;
        #[allow(clippy::cast_sign_loss)]
        let now_millis = now.timestamp_millis().max(0) as u64;

        let mut due_keys: Vec<Vec<u8>> = Vec::new();
        for item in self.db.iterator_cf(&cf_due, IteratorMode::Start) {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let (millis, _) = keys::extract_webhook_due_key(&key);
            if millis > now_millis {
                break;
            }
            due_keys.push(key.to_vec());
            if due_keys.len() >= limit {
                break;
            }
        }

        let mut claimed = Vec::new();
        for key in due_keys {
            let (_, event_id) = keys::extract_webhook_due_key(&key);

            let Some(mut event) = self.get_webhook(&event_id)? else {
                // Stale index row; drop it.
                self.db
                    .delete_cf(&cf_due, &key)
                    .map_err(|e| StoreError::Database(e.to_string()))?;
                continue;
            };

            if !event.is_due(now) {
                self.db
                    .delete_cf(&cf_due, &key)
                    .map_err(|e| StoreError::Database(e.to_string()))?;
                continue;
            }

            event.claim();
            self.put_webhook(&event)?;
            claimed.push(event);
        }

        Ok(claimed)
    }

    fn list_dead_letters(&self, limit: usize) -> Result<Vec<WebhookEvent>> {
        let cf = self.cf(cf::WEBHOOKS)?;

        let mut dead = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let event: WebhookEvent = Self::deserialize(&value)?;
            if event.status == WebhookStatus::DeadLetter {
                dead.push(event);
            }
        }

        dead.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        dead.truncate(limit);

        Ok(dead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tollgate_core::EventKind;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn create_account(store: &RocksStore, overdraft_limit: i64) -> AccountId {
        let account_id = AccountId::generate();
        let account = Account::with_overdraft_limit(account_id, overdraft_limit);
        store.put_account(&account).unwrap();
        account_id
    }

    fn grant_op(account_id: AccountId, amount: i64, key: &str) -> GrantOp {
        GrantOp {
            account_id,
            amount,
            reason: "purchase".into(),
            idempotency_key: key.into(),
            metadata: serde_json::Value::Null,
        }
    }

    fn consume_op(account_id: AccountId, amount: i64, key: &str) -> ConsumeOp {
        ConsumeOp {
            account_id,
            amount,
            reason: "use".into(),
            idempotency_key: key.into(),
            tool_id: None,
        }
    }

    #[test]
    fn account_crud() {
        let (store, _dir) = create_test_store();
        let account_id = create_account(&store, 0);

        let retrieved = store.get_account(&account_id).unwrap().unwrap();
        assert!(retrieved.active);
        assert_eq!(store.balance(&account_id).unwrap(), 0);

        let deactivated = store.deactivate_account(&account_id).unwrap();
        assert!(!deactivated.active);
    }

    #[test]
    fn balance_of_unknown_account_fails() {
        let (store, _dir) = create_test_store();
        let result = store.balance(&AccountId::generate());
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn grant_then_consume() {
        let (store, _dir) = create_test_store();
        let account_id = create_account(&store, 0);

        let granted = store.grant(&grant_op(account_id, 100, "g1")).unwrap();
        assert_eq!(granted.balance_after, 100);
        assert!(!granted.is_duplicate);

        let consumed = store.consume(&consume_op(account_id, 30, "c1")).unwrap();
        assert_eq!(consumed.balance_after, 70);
        assert_eq!(store.balance(&account_id).unwrap(), 70);

        // Ledger reflects both operations, newest first.
        let entries = store.list_entries(&account_id, 10, 0).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].signed_amount(), -30);
        assert_eq!(entries[0].balance_after, 70);
        assert_eq!(entries[1].signed_amount(), 100);
    }

    #[test]
    fn idempotent_replay_writes_one_entry() {
        let (store, _dir) = create_test_store();
        let account_id = create_account(&store, 0);
        store.grant(&grant_op(account_id, 100, "g1")).unwrap();

        let first = store.consume(&consume_op(account_id, 30, "c1")).unwrap();
        let replay = store.consume(&consume_op(account_id, 30, "c1")).unwrap();

        assert!(!first.is_duplicate);
        assert!(replay.is_duplicate);
        assert_eq!(replay.balance_after, first.balance_after);
        assert_eq!(replay.entry_id, first.entry_id);

        assert_eq!(store.balance(&account_id).unwrap(), 70);
        assert_eq!(store.list_entries(&account_id, 10, 0).unwrap().len(), 2);
    }

    #[test]
    fn idempotency_key_is_not_replayed_across_accounts() {
        let (store, _dir) = create_test_store();
        let a = create_account(&store, 0);
        let b = create_account(&store, 0);
        store.grant(&grant_op(a, 100, "fund-a")).unwrap();
        store.grant(&grant_op(b, 100, "fund-b")).unwrap();

        let first = store.consume(&consume_op(a, 30, "shared-key")).unwrap();
        assert_eq!(first.balance_after, 70);

        // The same key on another account must not echo A's outcome.
        let result = store.consume(&consume_op(b, 30, "shared-key"));
        assert!(matches!(result, Err(StoreError::Validation(_))));

        let result = store.grant(&grant_op(b, 30, "shared-key"));
        assert!(matches!(result, Err(StoreError::Validation(_))));

        // B keeps its funding grant and nothing else.
        assert_eq!(store.balance(&b).unwrap(), 100);
        assert_eq!(store.list_entries(&b, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn overdraft_boundary() {
        let (store, _dir) = create_test_store();
        let account_id = create_account(&store, 50);

        let outcome = store.consume(&consume_op(account_id, 50, "c1")).unwrap();
        assert_eq!(outcome.balance_after, -50);

        let result = store.consume(&consume_op(account_id, 1, "c2"));
        match result {
            Err(StoreError::InsufficientCredits {
                balance,
                required,
                shortfall,
            }) => {
                assert_eq!(balance, -50);
                assert_eq!(required, 1);
                assert_eq!(shortfall, 1);
            }
            other => panic!("expected InsufficientCredits, got {other:?}"),
        }

        // The rejected debit wrote nothing.
        assert_eq!(store.balance(&account_id).unwrap(), -50);
        assert_eq!(store.list_entries(&account_id, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn insufficient_credits_reports_shortfall() {
        let (store, _dir) = create_test_store();
        let account_id = create_account(&store, 0);
        store.grant(&grant_op(account_id, 70, "g1")).unwrap();

        let result = store.consume(&consume_op(account_id, 1000, "c1"));
        match result {
            Err(StoreError::InsufficientCredits {
                balance, shortfall, ..
            }) => {
                assert_eq!(balance, 70);
                assert_eq!(shortfall, 930);
            }
            other => panic!("expected InsufficientCredits, got {other:?}"),
        }
    }

    #[test]
    fn inactive_account_rejects_operations() {
        let (store, _dir) = create_test_store();
        let account_id = create_account(&store, 0);
        store.deactivate_account(&account_id).unwrap();

        let result = store.grant(&grant_op(account_id, 100, "g1"));
        assert!(matches!(result, Err(StoreError::AccountInactive { .. })));

        let result = store.consume(&consume_op(account_id, 1, "c1"));
        assert!(matches!(result, Err(StoreError::AccountInactive { .. })));
    }

    #[test]
    fn validation_rejects_malformed_input() {
        let (store, _dir) = create_test_store();
        let account_id = create_account(&store, 0);

        let result = store.consume(&consume_op(account_id, 0, "c1"));
        assert!(matches!(result, Err(StoreError::Validation(_))));

        let mut op = consume_op(account_id, 10, "c2");
        op.reason = String::new();
        assert!(matches!(store.consume(&op), Err(StoreError::Validation(_))));

        let op = consume_op(account_id, 10, "");
        assert!(matches!(store.consume(&op), Err(StoreError::Validation(_))));
    }

    #[test]
    fn list_entries_pagination() {
        let (store, _dir) = create_test_store();
        let account_id = create_account(&store, 0);

        store.grant(&grant_op(account_id, 10, "g1")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2)); // Distinct ULID timestamps
        store.grant(&grant_op(account_id, 20, "g2")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        store.grant(&grant_op(account_id, 30, "g3")).unwrap();

        let page1 = store.list_entries(&account_id, 2, 0).unwrap();
        let page2 = store.list_entries(&account_id, 2, 2).unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(page2.len(), 1);
        assert_eq!(page1[0].amount, 30); // Newest first
        assert_eq!(page1[1].amount, 20);
        assert_eq!(page2[0].amount, 10);
    }

    #[test]
    fn reconcile_finds_no_mismatches_after_operations() {
        let (store, _dir) = create_test_store();
        let a = create_account(&store, 0);
        let b = create_account(&store, 25);

        store.grant(&grant_op(a, 100, "ga")).unwrap();
        store.consume(&consume_op(a, 40, "ca")).unwrap();
        store.grant(&grant_op(b, 10, "gb")).unwrap();
        store.consume(&consume_op(b, 30, "cb")).unwrap();

        assert!(store.reconcile().unwrap().is_empty());
    }

    #[test]
    fn reconcile_detects_divergence() {
        let (store, _dir) = create_test_store();
        let account_id = create_account(&store, 0);
        store.grant(&grant_op(account_id, 100, "g1")).unwrap();

        // Corrupt the projection directly, bypassing the compound ops.
        let cf = store.cf(cf::BALANCES).unwrap();
        let bad = RocksStore::serialize(&999_i64).unwrap();
        store
            .db
            .put_cf(&cf, keys::balance_key(&account_id), bad)
            .unwrap();

        let mismatches = store.reconcile().unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].materialized, 999);
        assert_eq!(mismatches[0].computed, 100);
    }

    #[test]
    fn concurrent_consumes_drain_to_zero() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);
        let account_id = create_account(&store, 0);

        let n = 8;
        let amount = 10;
        store
            .grant(&grant_op(account_id, n * amount, "fund"))
            .unwrap();

        let handles: Vec<_> = (0..n)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.consume(&consume_op(account_id, amount, &format!("c{i}")))
                })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            if handle.join().unwrap().is_ok() {
                ok += 1;
            }
        }

        assert_eq!(ok, n);
        assert_eq!(store.balance(&account_id).unwrap(), 0);
        assert!(store.reconcile().unwrap().is_empty());
    }

    #[test]
    fn concurrent_consumes_never_double_spend() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);
        let account_id = create_account(&store, 0);

        // Fund one call short: exactly one must fail.
        let n: i64 = 6;
        let amount = 10;
        store
            .grant(&grant_op(account_id, (n - 1) * amount, "fund"))
            .unwrap();

        let handles: Vec<_> = (0..n)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.consume(&consume_op(account_id, amount, &format!("c{i}")))
                })
            })
            .collect();

        let mut ok = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::InsufficientCredits { .. }) => insufficient += 1,
                Err(e) => panic!("unexpected error: {e:?}"),
            }
        }

        assert_eq!(ok, n - 1);
        assert_eq!(insufficient, 1);
        assert_eq!(store.balance(&account_id).unwrap(), 0);
    }

    #[test]
    fn webhook_queue_lease_and_backoff() {
        let (store, _dir) = create_test_store();
        let tool_id = tollgate_core::ToolId::generate();

        let event = WebhookEvent::new(
            tool_id,
            EventKind::CreditsConsumed,
            serde_json::json!({"amount": 5}),
            "https://tool.example/hook".into(),
            "whsec_test".into(),
        );
        store.put_webhook(&event).unwrap();

        // Due immediately; claiming leases it.
        let now = Utc::now();
        let claimed = store.claim_due_webhooks(now, 10).unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].status, WebhookStatus::Retrying);

        // A second sweep sees nothing while the lease is held.
        assert!(store.claim_due_webhooks(now, 10).unwrap().is_empty());

        // Failure reschedules with backoff; not due until the delay passes.
        let mut event = claimed.into_iter().next().unwrap();
        event.record_failure("503".into(), now);
        store.put_webhook(&event).unwrap();

        assert!(store.claim_due_webhooks(now, 10).unwrap().is_empty());
        let later = now + chrono::Duration::seconds(61);
        let reclaimed = store.claim_due_webhooks(later, 10).unwrap();
        assert_eq!(reclaimed.len(), 1);
        assert_eq!(reclaimed[0].retry_count, 1);
    }

    #[test]
    fn dead_letters_listed_and_not_claimed() {
        let (store, _dir) = create_test_store();
        let tool_id = tollgate_core::ToolId::generate();

        let mut event = WebhookEvent::new(
            tool_id,
            EventKind::CreditsGranted,
            serde_json::json!({}),
            "https://tool.example/hook".into(),
            "whsec_test".into(),
        );
        let now = Utc::now();
        for _ in 0..6 {
            event.record_failure("timeout".into(), now);
        }
        assert_eq!(event.status, WebhookStatus::DeadLetter);
        store.put_webhook(&event).unwrap();

        let far_future = now + chrono::Duration::hours(48);
        assert!(store.claim_due_webhooks(far_future, 10).unwrap().is_empty());

        let dead = store.list_dead_letters(10).unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].event_id, event.event_id);
    }
}
