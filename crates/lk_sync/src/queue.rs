//! Offline-durable send queue with background sync.
//!
//! State machine per message:
//! `pending → processing → {sent | pending(retry) | failed}`
//!
//! A sync pass drains unsynced messages strictly FIFO by local creation
//! time. Per-message failures are isolated — one unreachable message never
//! blocks the rest of the batch — while a missing identity aborts the whole
//! pass, since nothing is sendable without one. The pass is single-flight:
//! a reconnect event and a periodic timer firing together cannot
//! double-process a message, the loser just gets an empty report.
//!
//! Backoff rationale: doubling from 1s caps the worst-case pre-failure wait
//! at ~31s across five attempts without hammering a degraded backend.
//! After the cap only an explicit `retry_failed` resumes delivery, so an
//! undeliverable message cannot retry silently forever.

use std::future::Future;
use std::sync::Arc;

use lk_proto::{EncryptedPayload, MessageStatus, QueuedMessage};
use lk_store::Store;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::{
    config::SyncConfig,
    error::SyncError,
    remote::{AuthProvider, OutboundMessage, RemoteMessageStore},
};

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Messages delivered and acknowledged this pass.
    pub success: usize,
    /// Messages that hit the retry cap and were parked as failed.
    pub failed: usize,
}

/// Durable outgoing queue. Cheap to clone; clones share the same store and
/// the same single-flight guard.
#[derive(Clone)]
pub struct OfflineQueueService {
    store: Store,
    remote: Arc<dyn RemoteMessageStore>,
    auth: Arc<dyn AuthProvider>,
    config: SyncConfig,
    /// Instance-owned single-flight guard — deliberately NOT a process
    /// global, so independent queues (tests, multi-user sessions) never
    /// serialise against each other.
    sync_guard: Arc<tokio::sync::Mutex<()>>,
}

impl OfflineQueueService {
    pub fn new(
        store: Store,
        remote: Arc<dyn RemoteMessageStore>,
        auth: Arc<dyn AuthProvider>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            remote,
            auth,
            config,
            sync_guard: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Append an already-encrypted message to the queue: status `pending`,
    /// zero retries, unsynced.
    pub async fn queue_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        payload: EncryptedPayload,
    ) -> Result<QueuedMessage, SyncError> {
        let msg = QueuedMessage::new(conversation_id, sender_id, payload);
        self.store.enqueue(&msg).await?;
        info!(
            "[queue] queued message {} for conversation {}",
            msg.id, msg.conversation_id
        );
        Ok(msg)
    }

    /// Unsynced messages, FIFO by local creation time.
    pub async fn queued(&self) -> Result<Vec<QueuedMessage>, SyncError> {
        Ok(self.store.unsynced().await?)
    }

    /// Cancel a queued message. If a sync attempt for it is mid-flight, the
    /// attempt completes as a benign no-op.
    pub async fn remove(&self, id: &str) -> Result<bool, SyncError> {
        Ok(self.store.remove_message(id).await?)
    }

    pub async fn clear_synced(&self) -> Result<u64, SyncError> {
        Ok(self.store.clear_synced().await?)
    }

    pub async fn clear_queue(&self) -> Result<u64, SyncError> {
        Ok(self.store.clear_queue().await?)
    }

    /// Manual recovery: every failed message back to pending with retries
    /// reset to zero. Returns how many were revived.
    pub async fn retry_failed(&self) -> Result<u64, SyncError> {
        let revived = self.store.reset_failed().await?;
        if revived > 0 {
            info!("[queue] revived {revived} failed messages");
        }
        Ok(revived)
    }

    /// Drain the queue: one attempt per message, in order.
    ///
    /// Single-flight: when another pass holds the guard this returns
    /// `{success: 0, failed: 0}` immediately without touching anything.
    /// `Err(Authentication)` aborts the pass — no message is processable
    /// without a signed-in identity.
    pub async fn sync_queue(&self) -> Result<SyncReport, SyncError> {
        let Ok(_guard) = self.sync_guard.try_lock() else {
            debug!("[queue] sync already in flight — skipping");
            return Ok(SyncReport::default());
        };

        if self.auth.current_user().await.is_none() {
            return Err(SyncError::Authentication);
        }

        let batch = self.store.unsynced().await?;
        if batch.is_empty() {
            return Ok(SyncReport::default());
        }
        debug!("[queue] sync pass over {} messages", batch.len());

        let mut report = SyncReport::default();
        for msg in batch {
            // Permanently failed messages wait for explicit retry_failed().
            if msg.status == MessageStatus::Failed {
                continue;
            }
            if msg.retries >= self.config.max_retries {
                if self.store.mark_failed(&msg.id).await? {
                    warn!("[queue] message {} exceeded retry cap — parked", msg.id);
                    report.failed += 1;
                }
                continue;
            }
            // Row gone since the batch was read: cancelled, skip.
            if !self.store.mark_processing(&msg.id).await? {
                continue;
            }

            if msg.retries > 0 {
                tokio::time::sleep(self.config.backoff_delay(msg.retries)).await;
            }

            match self.send_one(&msg).await {
                Ok(sequence_number) => {
                    if !self.store.mark_sent(&msg.id, sequence_number).await? {
                        // Cancelled mid-flight; the message reached the
                        // remote store anyway.
                        debug!("[queue] message {} removed mid-sync", msg.id);
                    }
                    report.success += 1;
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        "[queue] send failed for {} (attempt {}): {e}",
                        msg.id,
                        msg.retries + 1
                    );
                    match self
                        .store
                        .record_failure(&msg.id, self.config.max_retries)
                        .await?
                    {
                        Some((retries, MessageStatus::Failed)) => {
                            error!(
                                "[queue] message {} permanently failed after {retries} attempts",
                                msg.id
                            );
                            report.failed += 1;
                        }
                        Some(_) => {}
                        None => debug!("[queue] message {} removed mid-sync", msg.id),
                    }
                }
                Err(e) => {
                    // Not the message's fault — hand it back untouched and
                    // abort the pass.
                    self.store.release_processing(&msg.id).await?;
                    return Err(e);
                }
            }
        }

        info!(
            "[queue] sync pass complete: sent={} failed={}",
            report.success, report.failed
        );
        Ok(report)
    }

    /// Periodic background drain. The single-flight guard makes overlap
    /// with reconnect-triggered passes harmless.
    pub fn spawn_background_sync(&self) -> tokio::task::JoinHandle<()> {
        let svc = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(svc.config.sync_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match svc.sync_queue().await {
                    Ok(r) if r.success + r.failed > 0 => {
                        info!(
                            "[queue] background sync: sent={} failed={}",
                            r.success, r.failed
                        );
                    }
                    Ok(_) => {}
                    Err(SyncError::Authentication) => {
                        debug!("[queue] background sync skipped: not signed in");
                    }
                    Err(e) => warn!("[queue] background sync error: {e}"),
                }
            }
        })
    }

    /// One delivery attempt: fetch the authoritative sequence number,
    /// insert, then best-effort bump the conversation timestamp.
    async fn send_one(&self, msg: &QueuedMessage) -> Result<i64, SyncError> {
        let seq = self
            .bounded(self.remote.next_sequence_number(&msg.conversation_id))
            .await?;
        let inserted = self
            .bounded(self.remote.insert(OutboundMessage::from_queued(msg, seq)))
            .await?;
        if let Err(e) = self
            .bounded(
                self.remote
                    .update_last_message_at(&msg.conversation_id, inserted.delivered_at),
            )
            .await
        {
            warn!(
                "[queue] update_last_message_at failed for {}: {e}",
                msg.conversation_id
            );
        }
        // The store may have returned a pre-existing row (idempotent
        // retry); its sequence number is the authoritative one.
        Ok(inserted.sequence_number)
    }

    /// Bound a remote call; expiry is a retryable failure, never a hung
    /// guard.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, SyncError>>,
    ) -> Result<T, SyncError> {
        match tokio::time::timeout(self.config.op_timeout(), fut).await {
            Ok(res) => res,
            Err(_) => Err(SyncError::Timeout(self.config.op_timeout_ms)),
        }
    }
}
