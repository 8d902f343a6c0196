//! Send-queue operations.
//!
//! Mutations are single guarded statements. Callers get back whether a row
//! was actually touched (`rows_affected`), which is how a sync pass tells a
//! completed attempt on a concurrently-cancelled message apart from a real
//! state change — the former is a benign no-op.

use chrono::Utc;
use lk_proto::{MessageStatus, QueuedMessage};

use crate::{db::Store, error::StoreError, models::QueuedMessageRow};

const QUEUED_COLUMNS: &str = "id, conversation_id, sender_id, encrypted_content, iv, status, \
     synced, retries, sequence_number, created_at, updated_at";

impl Store {
    /// Append a message to the queue.
    pub async fn enqueue(&self, msg: &QueuedMessage) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO queued_messages \
             (id, conversation_id, sender_id, encrypted_content, iv, status, synced, retries, \
              sequence_number, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&msg.id)
        .bind(&msg.conversation_id)
        .bind(&msg.sender_id)
        .bind(&msg.encrypted_content)
        .bind(&msg.initialization_vector)
        .bind(msg.status.as_str())
        .bind(msg.synced)
        .bind(msg.retries as i64)
        .bind(msg.sequence_number)
        .bind(msg.created_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All unsynced messages, FIFO by local creation time.
    pub async fn unsynced(&self) -> Result<Vec<QueuedMessage>, StoreError> {
        let rows: Vec<QueuedMessageRow> = sqlx::query_as(&format!(
            "SELECT {QUEUED_COLUMNS} FROM queued_messages \
             WHERE synced = 0 ORDER BY created_at ASC, rowid ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_message()).collect()
    }

    pub async fn get_message(&self, id: &str) -> Result<Option<QueuedMessage>, StoreError> {
        let row: Option<QueuedMessageRow> = sqlx::query_as(&format!(
            "SELECT {QUEUED_COLUMNS} FROM queued_messages WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.into_message()).transpose()
    }

    /// Transition an unsynced message to `processing` for a sync attempt.
    /// Returns false if the row is gone (cancelled) or already synced.
    pub async fn mark_processing(&self, id: &str) -> Result<bool, StoreError> {
        let res = sqlx::query(
            "UPDATE queued_messages SET status = 'processing', updated_at = ? \
             WHERE id = ? AND synced = 0",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Record a successful remote insert: synced, sent, sequence number.
    /// Returns false if the local row was removed while the attempt was in
    /// flight — the message is delivered either way.
    pub async fn mark_sent(&self, id: &str, sequence_number: i64) -> Result<bool, StoreError> {
        let res = sqlx::query(
            "UPDATE queued_messages \
             SET status = 'sent', synced = 1, sequence_number = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(sequence_number)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Hand a `processing` message back to the queue untouched — used when
    /// a sync pass aborts for reasons that are not the message's fault.
    pub async fn release_processing(&self, id: &str) -> Result<bool, StoreError> {
        let res = sqlx::query(
            "UPDATE queued_messages SET status = 'pending', updated_at = ? \
             WHERE id = ? AND status = 'processing' AND synced = 0",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Force a message into the terminal `failed` state.
    pub async fn mark_failed(&self, id: &str) -> Result<bool, StoreError> {
        let res = sqlx::query(
            "UPDATE queued_messages SET status = 'failed', updated_at = ? \
             WHERE id = ? AND synced = 0",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Record a failed send attempt: one atomic statement increments the
    /// retry counter and flips the status to `failed` once the cap is hit,
    /// so a concurrent cancel can never lose the increment.
    ///
    /// Returns the post-update `(retries, status)`, or None if the row was
    /// removed while the attempt was in flight.
    pub async fn record_failure(
        &self,
        id: &str,
        max_retries: u32,
    ) -> Result<Option<(u32, MessageStatus)>, StoreError> {
        let res = sqlx::query(
            "UPDATE queued_messages \
             SET retries = retries + 1, \
                 status = CASE WHEN retries + 1 >= ? THEN 'failed' ELSE 'pending' END, \
                 updated_at = ? \
             WHERE id = ? AND synced = 0",
        )
        .bind(max_retries as i64)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        match self.get_message(id).await? {
            Some(m) => Ok(Some((m.retries, m.status))),
            None => Ok(None), // removed between the update and the read
        }
    }

    /// Remove a single message (user cancel). A message mid-sync may still
    /// complete remotely; the in-flight attempt detects the missing row and
    /// treats it as a no-op.
    pub async fn remove_message(&self, id: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM queued_messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Drop everything already delivered.
    pub async fn clear_synced(&self) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM queued_messages WHERE synced = 1")
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    /// Drop the whole queue.
    pub async fn clear_queue(&self) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM queued_messages")
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    /// Manual recovery: every failed message back to pending with a clean
    /// retry counter.
    pub async fn reset_failed(&self) -> Result<u64, StoreError> {
        let res = sqlx::query(
            "UPDATE queued_messages \
             SET status = 'pending', retries = 0, updated_at = ? \
             WHERE status = 'failed' AND synced = 0",
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    /// Put a previously synced message back on the queue (conflict
    /// resolution chose the local version). No-op if the row is gone.
    pub async fn requeue(&self, id: &str) -> Result<bool, StoreError> {
        let res = sqlx::query(
            "UPDATE queued_messages \
             SET status = 'pending', synced = 0, retries = 0, sequence_number = NULL, \
                 updated_at = ? \
             WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}
