//! Database abstraction over SQLite via sqlx.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};

use crate::error::StoreError;

/// Central store handle. Cheap to clone (Arc internally).
#[derive(Clone)]
pub struct Store {
    pub pool: SqlitePool,
}

impl Store {
    /// Open (or create) the SQLite database at `db_path`.
    /// Runs all pending migrations automatically.
    ///
    /// WAL journal mode and foreign-key enforcement are configured at
    /// connection time here — NOT inside a migration, because SQLite forbids
    /// changing `journal_mode` inside a transaction and sqlx wraps every
    /// migration in one.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        tracing::debug!("[store] opened queue store at {}", db_path.display());
        Ok(Self { pool })
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use uuid::Uuid;

    #[tokio::test]
    async fn open_runs_migrations() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join(format!("{}.db", Uuid::new_v4())))
            .await
            .expect("open store");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queued_messages")
            .fetch_one(&store.pool)
            .await
            .expect("queued_messages exists");
        assert_eq!(count, 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conflicts")
            .fetch_one(&store.pool)
            .await
            .expect("conflicts exists");
        assert_eq!(count, 0);
    }
}
