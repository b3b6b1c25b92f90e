//! Fire-and-forget persistence for paired turns.
//!
//! Each session owns one `PersistenceQueue`: an unbounded channel drained
//! by a single detached worker task. Enqueueing never waits on the store,
//! and the single worker keeps one session's records in pairing order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::adapter::MemoryAdapter;

/// One completed user/assistant pair waiting to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub user_input: String,
    pub response: String,
    pub user_id: String,
}

/// Background writer for one session.
///
/// Dropping the queue without calling [`drain`](Self::drain) detaches the
/// worker; it still finishes every write already enqueued.
pub struct PersistenceQueue {
    tx: mpsc::UnboundedSender<PendingWrite>,
    worker: JoinHandle<()>,
}

impl PersistenceQueue {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(adapter: Arc<MemoryAdapter>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingWrite>();

        let worker = tokio::spawn(async move {
            while let Some(write) = rx.recv().await {
                // The adapter logs and swallows store failures, so one bad
                // write never stops the worker.
                adapter
                    .store(&write.user_input, &write.response, &write.user_id)
                    .await;
            }
            debug!("Persistence queue closed");
        });

        Self { tx, worker }
    }

    /// Hand a pair to the worker without waiting for it to be stored.
    pub fn enqueue(&self, write: PendingWrite) {
        if let Err(e) = self.tx.send(write) {
            warn!(
                user_id = %e.0.user_id,
                "Persistence worker is gone; dropping interaction"
            );
        }
    }

    /// Close the queue and wait until every enqueued write has been handled.
    pub async fn drain(self) {
        let Self { tx, worker } = self;
        drop(tx);
        if let Err(e) = worker.await {
            warn!(error = %e, "Persistence worker ended abnormally");
        }
    }
}
