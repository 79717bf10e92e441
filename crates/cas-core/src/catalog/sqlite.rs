use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use super::CatalogEntry;
use crate::error::CasError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entries (
    filepath TEXT PRIMARY KEY NOT NULL,
    hash     TEXT NOT NULL,
    filesize INTEGER NOT NULL,
    modtime  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_hash ON entries(hash);
";

const UPSERT: &str = "
INSERT INTO entries (filepath, hash, filesize, modtime)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(filepath) DO UPDATE SET
    hash = excluded.hash,
    filesize = excluded.filesize,
    modtime = excluded.modtime
";

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct CatalogRow {
    filepath: String,
    hash: String,
    filesize: i64,
    modtime: i64,
}

impl CatalogRow {
    fn into_entry(self) -> Result<CatalogEntry, CasError> {
        let file_size = u64::try_from(self.filesize).map_err(|_| {
            CasError::OutOfRange(format!("negative file size for {}", self.filepath))
        })?;
        Ok(CatalogEntry {
            modification_time: from_unix_nanos(self.modtime),
            filepath: self.filepath,
            hash: self.hash,
            file_size,
        })
    }
}

/// Write-through catalog stored in `catalog.db`.
///
/// Modification times are stored as nanoseconds since the Unix epoch, which
/// limits them to roughly 1677..2262.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteCatalog {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CasError> {
        let path = path.into();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        tracing::debug!(path = %path.display(), "opened sqlite catalog");
        Ok(Self { pool, path })
    }

    /// Database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace by path.
    pub async fn add_entry(&self, entry: &CatalogEntry) -> Result<(), CasError> {
        let size = i64::try_from(entry.file_size).map_err(|_| {
            CasError::OutOfRange(format!("file size {} of {}", entry.file_size, entry.filepath))
        })?;
        let nanos = entry.modification_time.timestamp_nanos_opt().ok_or_else(|| {
            CasError::OutOfRange(format!(
                "modification time {} of {}",
                entry.modification_time, entry.filepath
            ))
        })?;
        sqlx::query(UPSERT)
            .bind(&entry.filepath)
            .bind(&entry.hash)
            .bind(size)
            .bind(nanos)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Entry for `filepath`.
    pub async fn get_entry(&self, filepath: &str) -> Result<CatalogEntry, CasError> {
        let row = sqlx::query_as::<_, CatalogRow>(
            "SELECT filepath, hash, filesize, modtime FROM entries WHERE filepath = ?1",
        )
        .bind(filepath)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => row.into_entry(),
            None => Err(CasError::EntryNotFound(filepath.to_string())),
        }
    }

    /// All entries, ascending by path.
    pub async fn list_entries(&self) -> Result<Vec<CatalogEntry>, CasError> {
        let rows = sqlx::query_as::<_, CatalogRow>(
            "SELECT filepath, hash, filesize, modtime FROM entries ORDER BY filepath",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CatalogRow::into_entry).collect()
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn from_unix_nanos(nanos: i64) -> DateTime<Utc> {
    let secs = nanos.div_euclid(1_000_000_000);
    let subsec = nanos.rem_euclid(1_000_000_000) as u32;
    DateTime::from_timestamp(secs, subsec).unwrap_or_default()
}
