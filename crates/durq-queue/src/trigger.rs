//! Delivery trigger loop.
//!
//! Each open queue owns one trigger task. Callers post a wake-up; the task
//! yields once to the scheduler and then runs a single delivery check, so a
//! delivery never fires inside the call that caused it and back-to-back
//! deliveries always give other tasks a turn.

use std::sync::Weak;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// The work run on every trigger.
#[async_trait]
pub(crate) trait DeliveryCheck: Send + Sync {
    async fn check_delivery(&self);
}

/// Handle to a running trigger task. Dropping it stops the task.
pub(crate) struct TriggerLoop {
    tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl TriggerLoop {
    /// Spawn the trigger task on the current runtime.
    ///
    /// The target is held weakly so an abandoned queue is not kept alive by
    /// its own loop.
    pub(crate) fn spawn(target: Weak<dyn DeliveryCheck>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tokio::task::yield_now().await;
                let Some(target) = target.upgrade() else {
                    break;
                };
                target.check_delivery().await;
            }
            trace!("Trigger loop exited");
        });
        Self { tx, task }
    }

    /// Request a delivery check.
    pub(crate) fn notify(&self) {
        let _ = self.tx.send(());
    }
}

impl Drop for TriggerLoop {
    fn drop(&mut self) {
        self.task.abort();
    }
}
