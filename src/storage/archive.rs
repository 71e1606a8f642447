use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::error_handling::types::StorageError;

/// Append-only store of archived originals. Rows are never updated or
/// deleted, and `id` is deliberately not unique: re-running the merge
/// pipeline over overlapping ranges appends again.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    pub(crate) pool: Pool<Sqlite>,
}

impl ArchiveStore {
    /// Opens (creating if missing) the archive database and its schema.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let opts = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(StorageError::ConnectionFailed)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS connections_archive (
                id          TEXT NOT NULL,
                source_ip   TEXT,
                host        TEXT,
                upload      INTEGER,
                download    INTEGER,
                start       INTEGER,
                chain       TEXT,
                archived_at INTEGER
            );",
        )
        .execute(&pool)
        .await
        .map_err(StorageError::QueryFailed)?;

        Ok(Self { pool })
    }
}
