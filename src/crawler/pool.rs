//! Fixed-size worker pool
//!
//! A pool is a set of worker tasks sharing one job queue. Each worker takes
//! one job at a time, so the number of jobs in flight never exceeds the pool
//! size. Jobs that panic are logged and do not take their worker down.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// A unit of work executed by a pool worker
pub type Job = BoxFuture<'static, ()>;

/// Fixed number of workers pulling jobs from a shared FIFO queue
pub struct WorkerPool {
    name: &'static str,
    sender: Mutex<Option<UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl WorkerPool {
    /// Spawns `size` workers on the given runtime
    pub fn new(name: &'static str, size: usize, runtime: &Handle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| runtime.spawn(run_worker(name, id, Arc::clone(&receiver))))
            .collect();

        tracing::debug!("Started {} pool with {} workers", name, size);

        Self {
            name,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns true once [`WorkerPool::shutdown`] has started
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Queues a job for execution
    ///
    /// Returns the job back if the pool no longer accepts work.
    pub fn submit(&self, job: Job) -> Result<(), Job> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.send(job).map_err(|rejected| rejected.0),
            None => Err(job),
        }
    }

    /// Stops the pool
    ///
    /// New submissions are rejected immediately. Workers finish the jobs
    /// already queued for up to `timeout`; after that they are aborted and
    /// given another `timeout` to unwind. A pool that still has not stopped
    /// is logged, never reported as an error. Calling this again is a no-op.
    pub async fn shutdown(&self, timeout: Duration) {
        self.closed.store(true, Ordering::Release);
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if workers.is_empty() {
            return;
        }

        let abort_handles: Vec<_> = workers.iter().map(JoinHandle::abort_handle).collect();
        let pending = futures::future::join_all(workers);
        tokio::pin!(pending);

        if tokio::time::timeout(timeout, pending.as_mut()).await.is_ok() {
            tracing::debug!("{} pool drained", self.name);
            return;
        }

        tracing::warn!(
            "{} pool did not drain within {:?}, aborting workers",
            self.name,
            timeout
        );
        for handle in &abort_handles {
            handle.abort();
        }

        if tokio::time::timeout(timeout, pending).await.is_err() {
            tracing::error!("{} pool did not terminate", self.name);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let workers = self.workers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for worker in workers.drain(..) {
            worker.abort();
        }
    }
}

async fn run_worker(
    pool: &'static str,
    id: usize,
    receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<Job>>>,
) {
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            tracing::warn!("{} worker {}: job panicked", pool, id);
        }
    }
    tracing::trace!("{} worker {} exiting", pool, id);
}
