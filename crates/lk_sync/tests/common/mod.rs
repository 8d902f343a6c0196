#![allow(dead_code)]

//! In-memory doubles for the remote collaborator traits, with scriptable
//! failure plans for exercising the retry path.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lk_proto::{KeyRecord, Message};
use lk_store::Store;
use lk_sync::remote::{
    AuthProvider, CurrentUser, OutboundMessage, RemoteKeyStore, RemoteMessageStore, WelcomeLedger,
};
use lk_sync::SyncError;
use uuid::Uuid;

pub async fn open_store() -> (Store, tempfile::TempDir) {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(format!("{}.db", Uuid::new_v4()));

    // Several integration tests run under `#[tokio::test(start_paused = true)]`.
    // sqlx's `SqlitePool` talks to each connection over a dedicated worker
    // thread; whenever the pool has to *wait* on that worker — establishing a
    // connection, or the default pre-acquire health-check ping — it wraps the
    // wait in an acquire-timeout timer. Under a paused clock tokio auto-advances
    // straight to that timer's deadline, so the wait "times out" instantly and
    // `Store::open`/every later query fails with `PoolTimedOut`.
    //
    // Build the store on a throwaway real-time runtime and hand back a pool
    // that never has to wait under the frozen clock: connections are warmed
    // eagerly here (min == max, so the pool is full before the paused test
    // touches it) and `test_before_acquire` is off (acquiring a warm connection
    // registers no timer). The pool is functionally identical to the one
    // `Store::open` builds — same WAL + foreign-key options, same migrations —
    // which `Store::open` itself still exercises in the non-paused tests.
    let store = std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("build real-time runtime");
        let store = rt.block_on(async {
            let opts = SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .foreign_keys(true);
            let pool = SqlitePoolOptions::new()
                .min_connections(4)
                .max_connections(4)
                .test_before_acquire(false)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(opts)
                .await
                .expect("connect pool");
            let migrations = std::path::Path::new(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/../lk_store/migrations"
            ));
            sqlx::migrate::Migrator::new(migrations)
                .await
                .expect("load migrations")
                .run(&pool)
                .await
                .expect("run migrations");
            Store { pool }
        });
        // Keep the connection worker threads alive for the test's duration;
        // dropping the runtime here would not close the pool (Store holds it),
        // but forgetting it avoids tearing down its bookkeeping early.
        std::mem::forget(rt);
        store
    })
    .join()
    .expect("store open thread panicked");
    (store, dir)
}

// ── Remote message store ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryMessageStore {
    messages: Mutex<Vec<Message>>,
    last_message_at: Mutex<HashMap<String, DateTime<Utc>>>,
    /// Errors to fail upcoming insert attempts with, per message id.
    fail_plan: Mutex<HashMap<String, VecDeque<SyncError>>>,
    insert_delay_ms: AtomicU64,
    pub insert_calls: AtomicUsize,
    remove_on_insert: Mutex<Option<(Store, String)>>,
}

impl MemoryMessageStore {
    /// Fail the next insert attempt for `message_id` with `err`.
    pub fn fail_once(&self, message_id: &str, err: SyncError) {
        self.fail_plan
            .lock()
            .unwrap()
            .entry(message_id.to_string())
            .or_default()
            .push_back(err);
    }

    /// Artificial latency on every insert (drives timeout tests).
    pub fn set_insert_delay(&self, ms: u64) {
        self.insert_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Cancel the local row for `message_id` while its insert is in flight.
    pub fn remove_local_row_on_insert(&self, store: Store, message_id: &str) {
        *self.remove_on_insert.lock().unwrap() = Some((store, message_id.to_string()));
    }

    pub fn by_conversation(&self, conversation_id: &str) -> Vec<Message> {
        let mut msgs: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        msgs.sort_by_key(|m| m.sequence_number);
        msgs
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.messages.lock().unwrap().iter().any(|m| m.id == message_id)
    }

    pub fn total_messages(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn all_messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn last_message_at(&self, conversation_id: &str) -> Option<DateTime<Utc>> {
        self.last_message_at.lock().unwrap().get(conversation_id).copied()
    }
}

#[async_trait]
impl RemoteMessageStore for MemoryMessageStore {
    async fn insert(&self, message: OutboundMessage) -> Result<Message, SyncError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.insert_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if let Some(err) = self
            .fail_plan
            .lock()
            .unwrap()
            .get_mut(&message.id)
            .and_then(|q| q.pop_front())
        {
            return Err(err);
        }

        let removal = {
            let mut guard = self.remove_on_insert.lock().unwrap();
            match guard.as_ref() {
                Some((_, id)) if *id == message.id => guard.take(),
                _ => None,
            }
        };
        if let Some((store, id)) = removal {
            store.remove_message(&id).await?;
        }

        let mut messages = self.messages.lock().unwrap();
        // Idempotent in id, per the trait contract.
        if let Some(existing) = messages.iter().find(|m| m.id == message.id) {
            return Ok(existing.clone());
        }
        let inserted = Message {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            encrypted_content: message.encrypted_content,
            iv: message.iv,
            sequence_number: message.sequence_number,
            delivered_at: Utc::now(),
            edited: false,
            deleted: false,
        };
        messages.push(inserted.clone());
        Ok(inserted)
    }

    async fn next_sequence_number(&self, conversation_id: &str) -> Result<i64, SyncError> {
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .map(|m| m.sequence_number)
            .max()
            .unwrap_or(0)
            + 1)
    }

    async fn update_last_message_at(
        &self,
        conversation_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        self.last_message_at
            .lock()
            .unwrap()
            .insert(conversation_id.to_string(), at);
        Ok(())
    }
}

// ── Remote key store ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryKeyStore {
    records: Mutex<HashMap<String, KeyRecord>>,
    pub upserts: AtomicUsize,
}

impl MemoryKeyStore {
    /// Plant a record directly (legacy/corruption scenarios).
    pub fn put_raw(&self, record: KeyRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.user_id.clone(), record);
    }

    pub fn record(&self, user_id: &str) -> Option<KeyRecord> {
        self.records.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl RemoteKeyStore for MemoryKeyStore {
    async fn upsert(&self, record: KeyRecord) -> Result<(), SyncError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<KeyRecord>, SyncError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(user_id)
            .filter(|r| !r.revoked)
            .cloned())
    }
}

// ── Auth ─────────────────────────────────────────────────────────────────────

pub struct StaticAuth(Mutex<Option<CurrentUser>>);

impl StaticAuth {
    pub fn signed_in(user_id: &str) -> Self {
        Self(Mutex::new(Some(CurrentUser {
            id: user_id.to_string(),
            email: format!("{user_id}@example.test"),
        })))
    }

    pub fn signed_out() -> Self {
        Self(Mutex::new(None))
    }

    pub fn sign_out(&self) {
        *self.0.lock().unwrap() = None;
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn current_user(&self) -> Option<CurrentUser> {
        self.0.lock().unwrap().clone()
    }
}

// ── Welcome ledger ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryLedger {
    welcomed: Mutex<HashSet<String>>,
    pub marks: AtomicUsize,
}

#[async_trait]
impl WelcomeLedger for MemoryLedger {
    async fn is_welcomed(&self, user_id: &str) -> Result<bool, SyncError> {
        Ok(self.welcomed.lock().unwrap().contains(user_id))
    }

    async fn mark_welcomed(&self, user_id: &str) -> Result<(), SyncError> {
        self.marks.fetch_add(1, Ordering::SeqCst);
        self.welcomed.lock().unwrap().insert(user_id.to_string());
        Ok(())
    }
}
