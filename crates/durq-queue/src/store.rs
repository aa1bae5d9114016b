//! Durable job store.
//!
//! The queue engine consumes storage through [`JobStore`]: insert, delete,
//! ordered head scan, point lookup, payload search and a running count that
//! the store maintains on its own.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::QueueError;
use crate::job::JobId;

/// A job row as persisted, payload still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredJob {
    pub id: JobId,
    pub payload: String,
}

/// Job store trait for persistence.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Open the storage handle and ensure the schema exists.
    async fn open(&self) -> Result<(), QueueError>;

    /// Close the storage handle.
    async fn close(&self) -> Result<(), QueueError>;

    /// Check whether the handle is open.
    fn is_open(&self) -> bool;

    /// Insert an encoded payload, returning the assigned id.
    async fn insert(&self, payload: String) -> Result<JobId, QueueError>;

    /// Delete a job, returning the number of rows removed.
    async fn delete(&self, id: JobId) -> Result<usize, QueueError>;

    /// Check whether a job exists.
    async fn contains(&self, id: JobId) -> Result<bool, QueueError>;

    /// Load up to `limit` oldest jobs in ascending id order.
    async fn head(&self, limit: usize) -> Result<Vec<StoredJob>, QueueError>;

    /// Read the store-maintained job count.
    async fn count(&self) -> Result<u64, QueueError>;

    /// Count rows with a full scan.
    async fn count_rows(&self) -> Result<u64, QueueError>;

    /// Ids of jobs whose encoded payload equals `payload`, ascending.
    async fn find(&self, payload: &str, limit: Option<usize>) -> Result<Vec<JobId>, QueueError>;
}

#[derive(Default)]
struct MemoryTables {
    jobs: BTreeMap<JobId, String>,
    last_id: i64,
    total: u64,
}

/// In-memory job store for testing.
///
/// Rows survive `close`/`open` cycles for the lifetime of the store value,
/// which makes it usable for restart scenarios without touching disk.
pub struct MemoryJobStore {
    tables: RwLock<MemoryTables>,
    open: AtomicBool,
}

impl MemoryJobStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(MemoryTables::default()),
            open: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(QueueError::NotOpen)
        }
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn open(&self) -> Result<(), QueueError> {
        self.open.store(true, Ordering::SeqCst);
        debug!("MemoryJobStore opened");
        Ok(())
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn insert(&self, payload: String) -> Result<JobId, QueueError> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        tables.last_id += 1;
        let id = JobId::new(tables.last_id);
        tables.jobs.insert(id, payload);
        tables.total += 1;
        Ok(id)
    }

    async fn delete(&self, id: JobId) -> Result<usize, QueueError> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        match tables.jobs.remove(&id) {
            Some(_) => {
                tables.total -= 1;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn contains(&self, id: JobId) -> Result<bool, QueueError> {
        self.ensure_open()?;
        Ok(self.tables.read().await.jobs.contains_key(&id))
    }

    async fn head(&self, limit: usize) -> Result<Vec<StoredJob>, QueueError> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .iter()
            .take(limit)
            .map(|(id, payload)| StoredJob {
                id: *id,
                payload: payload.clone(),
            })
            .collect())
    }

    async fn count(&self) -> Result<u64, QueueError> {
        self.ensure_open()?;
        Ok(self.tables.read().await.total)
    }

    async fn count_rows(&self) -> Result<u64, QueueError> {
        self.ensure_open()?;
        Ok(self.tables.read().await.jobs.len() as u64)
    }

    async fn find(&self, payload: &str, limit: Option<usize>) -> Result<Vec<JobId>, QueueError> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        let matches = tables
            .jobs
            .iter()
            .filter(|(_, stored)| stored.as_str() == payload)
            .map(|(id, _)| *id);
        Ok(match limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
