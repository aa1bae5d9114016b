//! SQLite job store implementation.

use async_trait::async_trait;
use durq_config::StorageLocation;
use parking_lot::RwLock;
use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::error::QueueError;
use crate::job::JobId;
use crate::schema::init_schema;
use crate::store::{JobStore, StoredJob};

/// SQLite-based job store.
///
/// The job count lives in its own table and is maintained by insert/delete
/// triggers, so reading it never scans the job table.
pub struct SqliteJobStore {
    location: StorageLocation,
    conn: RwLock<Option<Connection>>,
}

impl SqliteJobStore {
    /// Create a store for the given location. Nothing is opened yet.
    pub fn new(location: StorageLocation) -> Self {
        Self {
            location,
            conn: RwLock::new(None),
        }
    }

    /// Create a store backed by an in-memory database.
    pub fn in_memory() -> Self {
        Self::new(StorageLocation::Memory)
    }

    /// Get the storage location.
    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Raw connection for out-of-band queries.
    ///
    /// Writes made through this handle bypass the queue's cache and count.
    pub fn connection(&self) -> Result<Connection, QueueError> {
        self.conn.read().clone().ok_or(QueueError::NotOpen)
    }

    async fn connect(&self) -> Result<Connection, QueueError> {
        let conn = match &self.location {
            StorageLocation::Memory => Connection::open_in_memory().await?,
            StorageLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                Connection::open(path.clone()).await?
            }
        };

        conn.call(|conn| Ok(init_schema(conn)?)).await?;
        Ok(conn)
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn open(&self) -> Result<(), QueueError> {
        if self.is_open() {
            return Ok(());
        }
        let conn = self.connect().await?;
        *self.conn.write() = Some(conn);
        info!(location = ?self.location, "SQLite job store opened");
        Ok(())
    }

    async fn close(&self) -> Result<(), QueueError> {
        let conn = self.conn.write().take();
        if let Some(conn) = conn {
            conn.close().await?;
            debug!(location = ?self.location, "SQLite job store closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.conn.read().is_some()
    }

    async fn insert(&self, payload: String) -> Result<JobId, QueueError> {
        let id = self
            .connection()?
            .call(move |conn| {
                conn.execute("INSERT INTO jobs (payload) VALUES (?1)", params![payload])?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(JobId::new(id))
    }

    async fn delete(&self, id: JobId) -> Result<usize, QueueError> {
        let affected = self
            .connection()?
            .call(move |conn| Ok(conn.execute("DELETE FROM jobs WHERE id = ?1", params![id.get()])?))
            .await?;
        Ok(affected)
    }

    async fn contains(&self, id: JobId) -> Result<bool, QueueError> {
        let found = self
            .connection()?
            .call(move |conn| {
                let found = conn
                    .query_row("SELECT 1 FROM jobs WHERE id = ?1", params![id.get()], |_| Ok(()))
                    .optional()?;
                Ok(found.is_some())
            })
            .await?;
        Ok(found)
    }

    async fn head(&self, limit: usize) -> Result<Vec<StoredJob>, QueueError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self
            .connection()?
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT id, payload FROM jobs ORDER BY id ASC LIMIT ?1")?;
                let rows = stmt
                    .query_map(params![limit], |row| {
                        Ok(StoredJob {
                            id: JobId::new(row.get(0)?),
                            payload: row.get(1)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    async fn count(&self) -> Result<u64, QueueError> {
        let total: i64 = self
            .connection()?
            .call(|conn| {
                Ok(conn.query_row("SELECT total FROM job_count WHERE id = 0", [], |row| {
                    row.get(0)
                })?)
            })
            .await?;
        u64::try_from(total)
            .map_err(|_| QueueError::Desync(format!("negative job count {}", total)))
    }

    async fn count_rows(&self) -> Result<u64, QueueError> {
        let rows: i64 = self
            .connection()?
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?))
            .await?;
        Ok(rows as u64)
    }

    async fn find(&self, payload: &str, limit: Option<usize>) -> Result<Vec<JobId>, QueueError> {
        let payload = payload.to_string();
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let ids = self
            .connection()?
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id FROM jobs WHERE payload = ?1 ORDER BY id ASC LIMIT ?2",
                )?;
                let ids = stmt
                    .query_map(params![payload, limit], |row| row.get::<_, i64>(0))?
                    .map(|r| r.map(JobId::new))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
