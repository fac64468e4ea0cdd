//! Sequential asynchronous task queue for side effects
//!
//! A single worker task drains a FIFO channel and awaits each task to
//! completion before starting the next, so no two tasks ever run at the same
//! time. Failures and panics are caught at the task boundary and logged; the
//! worker keeps draining.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace, warn};

use crate::error::{QueueError, TaskError};

pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

struct PendingTask {
    id: u64,
    label: &'static str,
    /// Internal bookkeeping tasks (flush markers) stay out of the stats
    tracked: bool,
    future: TaskFuture,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub completed: u64,
    pub failed: u64,
    pub panicked: u64,
    /// Enqueued but not finished (includes the running task)
    pub pending: usize,
}

/// Handle to the queue; clones share the same worker
#[derive(Clone)]
pub struct AsyncTaskQueue {
    tx: mpsc::UnboundedSender<PendingTask>,
    stats: Arc<Mutex<QueueStats>>,
    next_id: Arc<AtomicU64>,
}

impl AsyncTaskQueue {
    /// Spawn the worker on the current Tokio runtime
    pub fn new() -> Result<Self, QueueError> {
        let handle = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        Ok(Self::with_handle(&handle))
    }

    /// Spawn the worker on `handle`
    pub fn with_handle(handle: &Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(Mutex::new(QueueStats::default()));
        handle.spawn(drain(rx, Arc::clone(&stats)));

        Self {
            tx,
            stats,
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append a task; never blocks
    pub fn enqueue<F>(&self, task: F) -> Result<u64, QueueError>
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.enqueue_labeled("task", task)
    }

    /// Append a task with a label used in logs
    pub fn enqueue_labeled<F>(&self, label: &'static str, task: F) -> Result<u64, QueueError>
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.push(label, true, Box::pin(task))
    }

    /// Wait until every task enqueued before this call has finished
    pub async fn flush(&self) -> Result<(), QueueError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.push(
            "flush",
            false,
            Box::pin(async move {
                let _ = done_tx.send(());
                Ok::<(), TaskError>(())
            }),
        )?;
        done_rx.await.map_err(|_| QueueError::Closed)
    }

    pub fn stats(&self) -> QueueStats {
        self.stats.lock().clone()
    }

    /// The worker has stopped (runtime shut down)
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn push(&self, label: &'static str, tracked: bool, future: TaskFuture) -> Result<u64, QueueError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        if tracked {
            let mut stats = self.stats.lock();
            stats.enqueued += 1;
            stats.pending += 1;
        }

        let task = PendingTask {
            id,
            label,
            tracked,
            future,
        };
        if self.tx.send(task).is_err() {
            if tracked {
                let mut stats = self.stats.lock();
                stats.enqueued -= 1;
                stats.pending -= 1;
            }
            return Err(QueueError::Closed);
        }

        trace!(task = id, label, "task enqueued");
        Ok(id)
    }
}

impl std::fmt::Debug for AsyncTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncTaskQueue")
            .field("stats", &self.stats())
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn drain(mut rx: mpsc::UnboundedReceiver<PendingTask>, stats: Arc<Mutex<QueueStats>>) {
    while let Some(task) = rx.recv().await {
        let PendingTask {
            id,
            label,
            tracked,
            future,
        } = task;

        let outcome = AssertUnwindSafe(future).catch_unwind().await;

        if tracked {
            let mut stats = stats.lock();
            stats.pending = stats.pending.saturating_sub(1);
            match &outcome {
                Ok(Ok(())) => stats.completed += 1,
                Ok(Err(_)) => stats.failed += 1,
                Err(_) => stats.panicked += 1,
            }
        }

        match outcome {
            Ok(Ok(())) => trace!(task = id, label, "task finished"),
            Ok(Err(err)) => warn!(task = id, label, error = %err, "queued task failed"),
            Err(panic) => error!(
                task = id,
                label,
                reason = panic_message(panic.as_ref()),
                "queued task panicked"
            ),
        }
    }

    debug!("task queue worker stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn logger() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn delayed_append(
        log: &Arc<Mutex<Vec<&'static str>>>,
        id: &'static str,
        delay_ms: u64,
    ) -> impl Future<Output = Result<(), TaskError>> + Send + 'static {
        let log = Arc::clone(log);
        async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            log.lock().push(id);
            Ok(())
        }
    }

    async fn exploding() -> Result<(), TaskError> {
        panic!("effect blew up")
    }

    #[tokio::test(start_paused = true)]
    async fn test_tasks_run_in_enqueue_order() {
        let queue = AsyncTaskQueue::new().unwrap();
        let log = logger();

        queue.enqueue(delayed_append(&log, "A", 30)).unwrap();
        queue.enqueue(delayed_append(&log, "B", 10)).unwrap();
        queue.enqueue(delayed_append(&log, "C", 5)).unwrap();
        queue.flush().await.unwrap();

        assert_eq!(*log.lock(), vec!["A", "B", "C"]);
        let stats = queue.stats();
        assert_eq!(stats.enqueued, 3);
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tasks_never_overlap() {
        let queue = AsyncTaskQueue::new().unwrap();
        let running = Arc::new(AtomicU64::new(0));
        let overlaps = Arc::new(AtomicU64::new(0));

        for delay in [20u64, 1, 7, 3] {
            let running = Arc::clone(&running);
            let overlaps = Arc::clone(&overlaps);
            queue
                .enqueue(async move {
                    if running.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
        }
        queue.flush().await.unwrap();

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_while_running_appends() {
        let queue = AsyncTaskQueue::new().unwrap();
        let log = logger();

        let inner_queue = queue.clone();
        let inner_log = Arc::clone(&log);
        queue
            .enqueue(async move {
                inner_queue
                    .enqueue(delayed_append(&inner_log, "late", 0))
                    .map_err(|e| TaskError::Failed(e.to_string()))?;
                tokio::time::sleep(Duration::from_millis(10)).await;
                inner_log.lock().push("first");
                Ok::<(), TaskError>(())
            })
            .unwrap();
        queue.enqueue(delayed_append(&log, "second", 0)).unwrap();

        // The first flush marker lands before "late" was appended.
        queue.flush().await.unwrap();
        queue.flush().await.unwrap();

        assert_eq!(*log.lock(), vec!["first", "second", "late"]);
    }

    #[tokio::test]
    async fn test_failures_and_panics_do_not_stop_draining() {
        let queue = AsyncTaskQueue::new().unwrap();
        let log = logger();

        queue
            .enqueue(async { Err(TaskError::Failed("write rejected".into())) })
            .unwrap();
        queue.enqueue(exploding()).unwrap();
        queue.enqueue(delayed_append(&log, "after", 0)).unwrap();
        queue.flush().await.unwrap();

        assert_eq!(*log.lock(), vec!["after"]);
        let stats = queue.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.panicked, 1);
        assert_eq!(stats.completed, 1);
    }

    #[test]
    fn test_new_without_runtime_fails() {
        assert_eq!(AsyncTaskQueue::new().unwrap_err(), QueueError::NoRuntime);
    }

    #[test]
    fn test_enqueue_after_runtime_shutdown_fails() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let queue = AsyncTaskQueue::with_handle(runtime.handle());
        drop(runtime);

        assert!(queue.is_closed());
        assert_eq!(queue.enqueue(async { Ok(()) }).unwrap_err(), QueueError::Closed);
        assert_eq!(queue.stats().enqueued, 0);
    }
}
