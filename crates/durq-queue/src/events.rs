//! Queue events and subscriber fan-out.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::job::{Job, JobId};

/// State transitions published by a queue.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent<P> {
    /// Storage opened and cache hydrated.
    Open,
    /// Storage closed and in-memory state reset.
    Close,
    /// Delivery enabled.
    Start,
    /// Delivery halted.
    Stop,
    /// A job was persisted.
    Add { id: JobId, payload: P },
    /// A job was removed by id.
    Delete { id: JobId },
    /// A job is delivered; answer with `done` or `abort`.
    Next(Job<P>),
    /// The backlog drained.
    Empty,
    /// The delivery loop failed and halted. No further deliveries follow
    /// until the queue is reopened.
    Fault(String),
}

impl<P> QueueEvent<P> {
    /// Stable event name.
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::Open => "open",
            QueueEvent::Close => "close",
            QueueEvent::Start => "start",
            QueueEvent::Stop => "stop",
            QueueEvent::Add { .. } => "add",
            QueueEvent::Delete { .. } => "delete",
            QueueEvent::Next(_) => "next",
            QueueEvent::Empty => "empty",
            QueueEvent::Fault(_) => "fault",
        }
    }
}

/// Fan-out of events to every live subscriber.
pub(crate) struct EventChannel<P> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<QueueEvent<P>>>>,
}

impl<P: Clone> EventChannel<P> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<QueueEvent<P>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Publish to all subscribers, dropping those whose receiver is gone.
    pub(crate) fn emit(&self, event: QueueEvent<P>) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
