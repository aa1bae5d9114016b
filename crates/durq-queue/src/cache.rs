//! Bounded in-memory window over the oldest pending jobs.

use std::collections::VecDeque;

use crate::error::QueueError;
use crate::job::{Job, JobId, JobPayload};
use crate::store::StoredJob;

/// A cached job with its stored encoding, kept for payload matching.
#[derive(Debug, Clone)]
struct CachedJob<P> {
    job: Job<P>,
    raw: String,
}

/// Read-through cache over the head of the store.
///
/// Every cached job is also present in the store; the cache only ever holds
/// the oldest `capacity` rows as of the last rehydration.
#[derive(Debug)]
pub(crate) struct QueueCache<P> {
    jobs: VecDeque<CachedJob<P>>,
    capacity: usize,
}

impl<P: JobPayload> QueueCache<P> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            jobs: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Decode a batch of rows. A single bad row fails the whole batch.
    pub(crate) fn decode_rows(&self, rows: Vec<StoredJob>) -> Result<Vec<(Job<P>, String)>, QueueError> {
        rows.into_iter()
            .take(self.capacity)
            .map(|row| {
                let payload = P::decode(&row.payload).map_err(|e| QueueError::Decode {
                    id: row.id,
                    message: e.to_string(),
                })?;
                Ok((Job::new(row.id, payload), row.payload))
            })
            .collect()
    }

    /// Replace the cache contents with a freshly loaded batch.
    pub(crate) fn replace(&mut self, batch: Vec<(Job<P>, String)>) {
        self.jobs.clear();
        self.jobs
            .extend(batch.into_iter().map(|(job, raw)| CachedJob { job, raw }));
    }

    pub(crate) fn head(&self) -> Option<&Job<P>> {
        self.jobs.front().map(|cached| &cached.job)
    }

    /// Remove a job by id, wherever it sits.
    pub(crate) fn remove(&mut self, id: JobId) -> bool {
        match self.jobs.iter().position(|cached| cached.job.id == id) {
            Some(index) => {
                self.jobs.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, id: JobId) -> bool {
        self.jobs.iter().any(|cached| cached.job.id == id)
    }

    /// Lowest cached id whose encoded payload equals `raw`.
    pub(crate) fn find_first(&self, raw: &str) -> Option<JobId> {
        self.jobs
            .iter()
            .find(|cached| cached.raw == raw)
            .map(|cached| cached.job.id)
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.jobs.clear();
    }
}
