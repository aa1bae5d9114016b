//! # durq Queue
//!
//! Durable single-consumer FIFO job queue.
//!
//! ## Features
//!
//! - Jobs persisted in SQLite, delivered strictly in insertion order
//! - Bounded in-memory window over the oldest jobs, refilled on demand
//! - Store-maintained job count, no table scans on size queries
//! - Event stream for lifecycle changes and deliveries
//! - Redelivery of unacknowledged jobs after abort or restart

mod cache;
pub mod error;
pub mod events;
pub mod job;
mod queue;
mod schema;
pub mod sqlite;
pub mod store;
mod trigger;

pub use durq_config::{QueueConfig, StorageLocation};
pub use error::QueueError;
pub use events::QueueEvent;
pub use job::{CodecError, Job, JobId, JobPayload};
pub use queue::Queue;
pub use sqlite::SqliteJobStore;
pub use store::{JobStore, MemoryJobStore, StoredJob};
