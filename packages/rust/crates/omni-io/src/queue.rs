//! Serialized write queue: at most one persistence operation in flight.
//!
//! Mutations are boxed futures pushed onto an unbounded channel and driven
//! one at a time by a single worker task. Callers await a oneshot carrying
//! the job's result, so ordering is the order of `run` calls.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, oneshot};

use crate::error::IoError;

type QueuedWrite = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Handle to a write queue worker. Clones share the same worker.
#[derive(Clone)]
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<QueuedWrite>,
    pending: Arc<AtomicUsize>,
}

impl WriteQueue {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// The worker exits once every handle has been dropped and the
    /// remaining jobs have drained.
    #[must_use]
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedWrite>();
        let pending = Arc::new(AtomicUsize::new(0));
        let worker_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
                worker_pending.fetch_sub(1, Ordering::AcqRel);
            }
            tracing::debug!("write queue worker drained");
        });
        Self { tx, pending }
    }

    /// Enqueue `job` and wait for its output.
    ///
    /// # Errors
    /// `IoError::QueueClosed` if the worker is gone or the job panicked.
    pub async fn run<F, T>(&self, job: F) -> Result<T, IoError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let wrapped: QueuedWrite = Box::pin(async move {
            let _ = done_tx.send(job.await);
        });
        self.pending.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(wrapped).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(IoError::QueueClosed);
        }
        done_rx.await.map_err(|_| IoError::QueueClosed)
    }

    /// Jobs queued or running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for WriteQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteQueue")
            .field("pending", &self.pending())
            .finish()
    }
}
