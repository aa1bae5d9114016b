//! Durable FIFO queue engine.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use durq_config::QueueConfig;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cache::QueueCache;
use crate::error::QueueError;
use crate::events::{EventChannel, QueueEvent};
use crate::job::{Job, JobId, JobPayload};
use crate::sqlite::SqliteJobStore;
use crate::store::JobStore;
use crate::trigger::{DeliveryCheck, TriggerLoop};

/// Mutable queue state. Never held across an await.
struct QueueState<P> {
    opened: bool,
    running: bool,
    /// `None` until the open-time hydration resolves it.
    empty: Option<bool>,
    /// Mirror of the store's job count, `None` while closed.
    count: Option<u64>,
    cache: QueueCache<P>,
    /// Job announced via `Next` and not yet acknowledged.
    in_flight: Option<JobId>,
    trigger: Option<TriggerLoop>,
}

impl<P: JobPayload> QueueState<P> {
    fn new(batch_size: usize) -> Self {
        Self {
            opened: false,
            running: false,
            empty: None,
            count: None,
            cache: QueueCache::new(batch_size),
            in_flight: None,
            trigger: None,
        }
    }

    /// Claim the cache head for delivery.
    fn claim_head(&mut self) -> Option<Job<P>> {
        let head = self.cache.head()?.clone();
        self.in_flight = Some(head.id);
        Some(head)
    }

    fn notify(&self) {
        if let Some(trigger) = &self.trigger {
            trigger.notify();
        }
    }
}

/// What a delivery check decided to do.
enum Step<P> {
    Idle,
    Deliver(Job<P>),
    Rehydrate,
    Drained,
}

struct Inner<P, S> {
    store: S,
    batch_size: usize,
    state: Mutex<QueueState<P>>,
    events: EventChannel<P>,
}

impl<P: JobPayload, S: JobStore> Inner<P, S> {
    fn notify(&self) {
        self.state.lock().notify();
    }

    fn decide(&self) -> Step<P> {
        let mut state = self.state.lock();
        if !state.opened
            || !state.running
            || state.empty == Some(true)
            || state.in_flight.is_some()
        {
            return Step::Idle;
        }
        if let Some(job) = state.claim_head() {
            return Step::Deliver(job);
        }
        if state.count.unwrap_or(0) > 0 {
            return Step::Rehydrate;
        }
        state.empty = Some(true);
        Step::Drained
    }

    async fn deliver_next(&self) -> Result<(), QueueError> {
        match self.decide() {
            Step::Idle => Ok(()),
            Step::Deliver(job) => {
                self.announce(job);
                Ok(())
            }
            Step::Drained => {
                info!("Queue drained");
                self.events.emit(QueueEvent::Empty);
                Ok(())
            }
            Step::Rehydrate => self.rehydrate_and_deliver().await,
        }
    }

    async fn rehydrate_and_deliver(&self) -> Result<(), QueueError> {
        let rows = self.store.head(self.batch_size).await?;
        let job = {
            let mut state = self.state.lock();
            if !state.opened {
                return Ok(());
            }
            let batch = state.cache.decode_rows(rows)?;
            state.cache.replace(batch);
            debug!(
                cached = state.cache.len(),
                batch_size = self.batch_size,
                "Rehydrated queue cache"
            );
            if state.cache.is_empty() {
                return Err(QueueError::Desync(format!(
                    "count is {} but the store has no jobs",
                    state.count.unwrap_or(0)
                )));
            }
            if !state.running || state.in_flight.is_some() {
                return Ok(());
            }
            state.claim_head()
        };
        if let Some(job) = job {
            self.announce(job);
        }
        Ok(())
    }

    fn announce(&self, job: Job<P>) {
        debug!(job_id = %job.id, "Delivering job");
        self.events.emit(QueueEvent::Next(job));
    }

    /// Errors raised inside the trigger loop have no caller to return to.
    fn fault(&self, err: QueueError) {
        error!(error = %err, "Delivery loop failed, halting queue");
        self.state.lock().running = false;
        self.events.emit(QueueEvent::Fault(err.to_string()));
    }
}

#[async_trait]
impl<P, S> DeliveryCheck for Inner<P, S>
where
    P: JobPayload,
    S: JobStore + 'static,
{
    async fn check_delivery(&self) {
        if let Err(err) = self.deliver_next().await {
            self.fault(err);
        }
    }
}

/// Durable single-consumer FIFO queue.
///
/// Jobs are persisted through a [`JobStore`] and delivered one at a time as
/// [`QueueEvent::Next`] to subscribers once the queue is started. The
/// consumer answers each delivery with [`Queue::done`] or [`Queue::abort`].
/// Cloning a queue yields another handle to the same instance.
pub struct Queue<P, S = SqliteJobStore> {
    inner: Arc<Inner<P, S>>,
}

impl<P, S> Clone for Queue<P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: JobPayload> Queue<P, SqliteJobStore> {
    /// Create a SQLite-backed queue. An empty location selects an in-memory
    /// database.
    pub fn new(config: &QueueConfig) -> Result<Self, QueueError> {
        let store = SqliteJobStore::new(config.storage());
        Self::with_store(config, store)
    }

    /// Raw database handle for out-of-band queries.
    ///
    /// Mutating the job tables through it desynchronizes the queue's cache
    /// and count until the queue is reopened.
    pub fn connection(&self) -> Result<tokio_rusqlite::Connection, QueueError> {
        self.inner.store.connection()
    }
}

impl<P, S> Queue<P, S>
where
    P: JobPayload,
    S: JobStore + 'static,
{
    /// Create a queue with a custom store.
    pub fn with_store(config: &QueueConfig, store: S) -> Result<Self, QueueError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                batch_size: config.batch_size,
                state: Mutex::new(QueueState::new(config.batch_size)),
                events: EventChannel::new(),
            }),
        })
    }

    /// Get the underlying store.
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get the batch size.
    pub fn batch_size(&self) -> usize {
        self.inner.batch_size
    }

    /// Subscribe to queue events.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<QueueEvent<P>> {
        self.inner.events.subscribe()
    }

    /// Open the store, load the job count and hydrate the cache.
    ///
    /// On failure the queue stays closed.
    pub async fn open(&self) -> Result<(), QueueError> {
        if self.is_open() {
            return Ok(());
        }

        self.inner.store.open().await?;
        let loaded = self.load_head().await;
        let (count, batch) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                if let Err(close_err) = self.inner.store.close().await {
                    warn!(error = %close_err, "Failed to close store after open failure");
                }
                return Err(err);
            }
        };

        {
            let mut state = self.inner.state.lock();
            // A concurrent open finished first.
            if state.opened {
                return Ok(());
            }
            let target = Arc::downgrade(&self.inner);
            let target: Weak<dyn DeliveryCheck> = target;
            state.trigger = Some(TriggerLoop::spawn(target));
            state.opened = true;
            state.running = false;
            state.count = Some(count);
            state.empty = Some(count == 0);
            state.cache.replace(batch);
            state.in_flight = None;
        }

        info!(count, batch_size = self.inner.batch_size, "Queue opened");
        self.inner.events.emit(QueueEvent::Open);
        Ok(())
    }

    async fn load_head(&self) -> Result<(u64, Vec<(Job<P>, String)>), QueueError> {
        let count = self.inner.store.count().await?;
        let rows = self.inner.store.head(self.inner.batch_size).await?;
        let batch = self.inner.state.lock().cache.decode_rows(rows)?;
        Ok((count, batch))
    }

    /// Close the store and reset all in-memory state.
    pub async fn close(&self) -> Result<(), QueueError> {
        let trigger = {
            let mut state = self.inner.state.lock();
            if !state.opened {
                return Ok(());
            }
            state.opened = false;
            state.running = false;
            state.count = None;
            state.empty = None;
            state.cache.clear();
            state.in_flight = None;
            state.trigger.take()
        };
        drop(trigger);

        self.inner.store.close().await?;
        info!("Queue closed");
        self.inner.events.emit(QueueEvent::Close);
        Ok(())
    }

    /// Persist a job, returning its id.
    pub async fn add(&self, payload: P) -> Result<JobId, QueueError> {
        self.ensure_open()?;
        let raw = payload
            .encode()
            .map_err(|e| QueueError::Encode(e.to_string()))?;
        let id = self.inner.store.insert(raw).await?;

        let count = {
            let mut state = self.inner.state.lock();
            // Closed while the insert was pending; the next open reloads the count.
            if state.opened {
                let count = state.count.unwrap_or(0) + 1;
                state.count = Some(count);
                if state.empty == Some(true) {
                    state.empty = Some(false);
                    if state.running {
                        state.notify();
                    }
                }
            }
            state.count
        };

        debug!(job_id = %id, count = ?count, "Added job");
        self.inner.events.emit(QueueEvent::Add { id, payload });
        Ok(id)
    }

    /// Begin delivering jobs.
    ///
    /// Starting a stopped queue re-announces the current head, so a job
    /// whose delivery was aborted is delivered again.
    pub fn start(&self) -> Result<(), QueueError> {
        {
            let mut state = self.inner.state.lock();
            if !state.opened {
                return Err(QueueError::NotOpen);
            }
            if state.running {
                return Ok(());
            }
            state.running = true;
            state.in_flight = None;
            state.notify();
        }

        info!("Queue started");
        self.inner.events.emit(QueueEvent::Start);
        Ok(())
    }

    /// Halt delivery. A job already announced stays announced.
    pub fn stop(&self) {
        {
            let mut state = self.inner.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
        }

        info!("Queue stopped");
        self.inner.events.emit(QueueEvent::Stop);
    }

    /// Give up on the delivered job without removing it.
    ///
    /// The job stays at the head and is delivered again after `start`.
    pub fn abort(&self) {
        debug!("Aborting delivery");
        self.stop();
    }

    /// Acknowledge the delivered job, removing it from cache and store.
    pub async fn done(&self) -> Result<(), QueueError> {
        let id = {
            let state = self.inner.state.lock();
            if !state.opened {
                return Err(QueueError::NotOpen);
            }
            state.in_flight.ok_or(QueueError::NoActiveJob)?
        };

        let affected = self.inner.store.delete(id).await?;

        {
            let mut state = self.inner.state.lock();
            if state.in_flight == Some(id) {
                state.in_flight = None;
            }
            state.cache.remove(id);
            if affected > 0 {
                state.count = state.count.map(|c| c.saturating_sub(1));
            }
            state.notify();
        }

        if affected == 0 {
            warn!(job_id = %id, "Delivered job was already removed from the store");
            return Err(QueueError::Desync(format!("job {} not found in store", id)));
        }

        debug!(job_id = %id, "Job done");
        Ok(())
    }

    /// Remove a job by id, whether or not it is at the head.
    ///
    /// Deleting the job currently delivered acknowledges it; delivery moves
    /// on to the next job and a later `done` reports `NoActiveJob`.
    pub async fn delete(&self, id: JobId) -> Result<(), QueueError> {
        self.ensure_open()?;
        let affected = self.inner.store.delete(id).await?;
        if affected == 0 {
            warn!(job_id = %id, "Delete matched no job");
            return Err(QueueError::Desync(format!("job {} not found in store", id)));
        }

        {
            let mut state = self.inner.state.lock();
            state.cache.remove(id);
            state.count = state.count.map(|c| c.saturating_sub(1));
            // Deleting the delivered job settles it like `done`.
            if state.in_flight == Some(id) {
                state.in_flight = None;
                if state.running {
                    state.notify();
                }
            }
        }

        debug!(job_id = %id, "Deleted job");
        self.inner.events.emit(QueueEvent::Delete { id });
        Ok(())
    }

    /// Check whether a job is pending.
    pub async fn has(&self, id: JobId) -> Result<bool, QueueError> {
        self.ensure_open()?;
        let cached = self.inner.state.lock().cache.contains(id);
        if cached {
            return Ok(true);
        }
        self.inner.store.contains(id).await
    }

    /// Ids of all jobs whose payload equals `pattern`, ascending.
    pub async fn job_ids(&self, pattern: &P) -> Result<Vec<JobId>, QueueError> {
        self.ensure_open()?;
        let raw = Self::encode_pattern(pattern)?;
        self.inner.store.find(&raw, None).await
    }

    /// Lowest id whose payload equals `pattern`.
    pub async fn first_job_id(&self, pattern: &P) -> Result<Option<JobId>, QueueError> {
        self.ensure_open()?;
        let raw = Self::encode_pattern(pattern)?;
        let cached = self.inner.state.lock().cache.find_first(&raw);
        if cached.is_some() {
            return Ok(cached);
        }
        let ids = self.inner.store.find(&raw, Some(1)).await?;
        Ok(ids.first().copied())
    }

    /// Number of pending jobs, `None` while the queue is closed.
    pub fn len(&self) -> Option<u64> {
        self.inner.state.lock().count
    }

    /// Whether the backlog is drained.
    pub fn is_empty(&self) -> Result<bool, QueueError> {
        self.inner.state.lock().empty.ok_or(QueueError::NotOpen)
    }

    /// Whether delivery is enabled.
    pub fn is_started(&self) -> bool {
        self.inner.state.lock().running
    }

    /// Whether the store handle is open.
    pub fn is_open(&self) -> bool {
        self.inner.state.lock().opened
    }

    /// Compare the mirrored count with a full scan of the store.
    pub async fn verify_count(&self) -> Result<u64, QueueError> {
        let mirrored = self.len().ok_or(QueueError::NotOpen)?;
        let rows = self.inner.store.count_rows().await?;
        if rows != mirrored {
            warn!(mirrored, rows, "Job count mismatch");
            return Err(QueueError::Desync(format!(
                "mirrored count {} but store holds {} jobs",
                mirrored, rows
            )));
        }
        Ok(rows)
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(QueueError::NotOpen)
        }
    }

    fn encode_pattern(pattern: &P) -> Result<String, QueueError> {
        pattern.encode().map_err(|e| QueueError::Encode(e.to_string()))
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
