//! Conflict persistence.
//!
//! Conflicts survive restarts in the same store as the queue; the three
//! version snapshots are stored as JSON columns and only ever read back
//! whole.

use chrono::Utc;
use lk_proto::ConflictInfo;

use crate::{db::Store, error::StoreError, models::ConflictRow};

const CONFLICT_COLUMNS: &str = "id, entity_type, entity_id, base_version, local_version, \
     remote_version, status, created_at, resolved_at";

impl Store {
    /// Record a detected divergence.
    pub async fn insert_conflict(&self, conflict: &ConflictInfo) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO conflicts \
             (id, entity_type, entity_id, base_version, local_version, remote_version, \
              status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&conflict.id)
        .bind(conflict.entity_type.as_str())
        .bind(&conflict.entity_id)
        .bind(serde_json::to_string(&conflict.base_version)?)
        .bind(serde_json::to_string(&conflict.local_version)?)
        .bind(serde_json::to_string(&conflict.remote_version)?)
        .bind(conflict.status.as_str())
        .bind(conflict.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_conflict(&self, id: &str) -> Result<Option<ConflictInfo>, StoreError> {
        let row: Option<ConflictRow> =
            sqlx::query_as(&format!("SELECT {CONFLICT_COLUMNS} FROM conflicts WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|r| r.into_conflict()).transpose()
    }

    /// Everything still waiting on an explicit decision, oldest first.
    pub async fn pending_conflicts(&self) -> Result<Vec<ConflictInfo>, StoreError> {
        let rows: Vec<ConflictRow> = sqlx::query_as(&format!(
            "SELECT {CONFLICT_COLUMNS} FROM conflicts \
             WHERE status = 'pending' ORDER BY created_at ASC, rowid ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_conflict()).collect()
    }

    /// Mark a pending conflict resolved. Returns false if it was already
    /// resolved (or never existed) — resolution is one-shot.
    pub async fn resolve_conflict(&self, id: &str) -> Result<bool, StoreError> {
        let res = sqlx::query(
            "UPDATE conflicts SET status = 'resolved', resolved_at = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lk_proto::{ConflictEntity, ConflictStatus, EntityVersion};
    use uuid::Uuid;

    async fn open_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join(format!("{}.db", Uuid::new_v4())))
            .await
            .expect("open store");
        (store, dir)
    }

    fn version(content: &str, author: &str) -> EntityVersion {
        EntityVersion {
            content: content.into(),
            updated_at: Utc::now(),
            author: author.into(),
        }
    }

    #[tokio::test]
    async fn conflict_round_trip_and_one_shot_resolution() {
        let (store, _dir) = open_store().await;
        let conflict = ConflictInfo::new(
            ConflictEntity::Message,
            "msg-1",
            version("base", "alice"),
            version("local", "alice"),
            version("remote", "bob"),
        );
        store.insert_conflict(&conflict).await.unwrap();

        let pending = store.pending_conflicts().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, conflict.id);
        assert_eq!(pending[0].local_version.content, "local");
        assert_eq!(pending[0].remote_version.content, "remote");

        assert!(store.resolve_conflict(&conflict.id).await.unwrap());
        assert!(!store.resolve_conflict(&conflict.id).await.unwrap());
        assert!(store.pending_conflicts().await.unwrap().is_empty());

        let resolved = store.get_conflict(&conflict.id).await.unwrap().unwrap();
        assert_eq!(resolved.status, ConflictStatus::Resolved);
    }
}
