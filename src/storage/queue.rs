//! Serialized write queue.
//!
//! Remote writes are pushed onto an unbounded channel and drained by a single
//! worker task, so at most one write per session is in flight and writes land
//! in enqueue order. A failed task is recorded as the last sync error and the
//! worker moves on to the next one.

use crate::backend::BackendError;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

pub type WriteTask = BoxFuture<'static, Result<(), BackendError>>;

enum Job {
    Write(WriteTask),
    Barrier(oneshot::Sender<()>),
}

/// Handle to one session's write pipeline.
///
/// A bound queue starts its worker on construction; an unbound one spawns it
/// on the caller's runtime at the first enqueue. Dropping every handle lets the
/// worker finish the jobs already queued and exit; nothing is cancelled.
#[derive(Clone, Default)]
pub struct WriteQueue {
    tx: Option<mpsc::UnboundedSender<Job>>,
    runtime: Option<Handle>,
    last_error: Arc<Mutex<Option<BackendError>>>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue whose worker is started now on `runtime`, so tasks can be
    /// enqueued from threads outside of it.
    pub fn with_runtime(runtime: Handle) -> Self {
        let mut queue = Self {
            runtime: Some(runtime),
            ..Self::default()
        };
        let _ = queue.sender();
        queue
    }

    /// Append a task; it runs after every task enqueued before it has settled.
    ///
    /// Without any runtime to start the worker on, the task is dropped and
    /// recorded as the last error.
    pub fn enqueue(&mut self, task: WriteTask) {
        match self.sender().map(|tx| tx.send(Job::Write(task)).is_ok()) {
            Some(true) => {}
            Some(false) => tracing::warn!("Sync worker is gone, dropping queued write"),
            None => {
                tracing::error!("No Tokio runtime for the sync worker, dropping queued write");
                *self.last_error.lock() = Some(BackendError::Other(
                    "no async runtime available for sync writes".to_string(),
                ));
            }
        }
    }

    /// Wait for every task enqueued so far, then report the last failure.
    pub async fn flush(&self) -> Result<(), BackendError> {
        if let Some(tx) = &self.tx {
            let (done_tx, done_rx) = oneshot::channel();
            if tx.send(Job::Barrier(done_tx)).is_ok() {
                let _ = done_rx.await;
            }
        }
        match self.last_error() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub fn last_error(&self) -> Option<BackendError> {
        self.last_error.lock().clone()
    }

    fn sender(&mut self) -> Option<&mpsc::UnboundedSender<Job>> {
        if self.tx.is_none() {
            let runtime = self.runtime.clone().or_else(|| Handle::try_current().ok())?;
            let (tx, rx) = mpsc::unbounded_channel();
            runtime.spawn(run_worker(rx, Arc::clone(&self.last_error)));
            self.tx = Some(tx);
        }
        self.tx.as_ref()
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Job>, last_error: Arc<Mutex<Option<BackendError>>>) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Write(task) => match task.await {
                Ok(()) => {
                    *last_error.lock() = None;
                }
                Err(e) => {
                    tracing::error!("Supabase sync error: {}", e);
                    *last_error.lock() = Some(e);
                }
            },
            Job::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Sync worker finished");
}
