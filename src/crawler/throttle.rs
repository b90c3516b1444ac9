//! Per-host admission control
//!
//! A [`HostThrottle`] lets at most `limit` download jobs for one host sit in
//! the download pool at a time. Extra jobs wait in a FIFO queue owned by the
//! throttle, so no pool worker is ever parked waiting for a host slot.
//!
//! When an admitted job finishes, its slot goes straight to the next waiting
//! job instead of being released and acquired again.

use crate::crawler::pool::{Job, WorkerPool};
use futures::FutureExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct ThrottleState {
    running: usize,
    waiting: VecDeque<Job>,
}

/// Admission gate for the downloads of a single host
pub struct HostThrottle {
    host: String,
    limit: usize,
    pool: Arc<WorkerPool>,
    state: Mutex<ThrottleState>,
}

impl HostThrottle {
    /// Creates a throttle admitting at most `limit` concurrent jobs
    ///
    /// `limit` must be at least 1; the engine validates it on construction.
    pub fn new(host: impl Into<String>, limit: usize, pool: Arc<WorkerPool>) -> Arc<Self> {
        debug_assert!(limit >= 1, "host limit must be at least 1");
        Arc::new(Self {
            host: host.into(),
            limit,
            pool,
            state: Mutex::new(ThrottleState::default()),
        })
    }

    /// Number of admitted jobs that have not finished yet
    pub fn running(&self) -> usize {
        self.lock_state().running
    }

    /// Number of jobs queued behind the admitted ones
    pub fn waiting(&self) -> usize {
        self.lock_state().waiting.len()
    }

    /// Submits `job` to the pool if a slot is free, otherwise queues it
    pub fn schedule(self: &Arc<Self>, job: Job) {
        let mut state = self.lock_state();
        if state.running >= self.limit {
            state.waiting.push_back(job);
            tracing::debug!(
                "Host {} at limit {}, {} waiting",
                self.host,
                self.limit,
                state.waiting.len()
            );
            return;
        }
        state.running += 1;
        drop(state);

        self.dispatch(job);
    }

    /// Hands an already-acquired slot to `job` and submits it
    fn dispatch(self: &Arc<Self>, job: Job) {
        let slot = Slot {
            throttle: Arc::clone(self),
        };
        let admitted = async move {
            let _slot = slot;
            job.await;
        }
        .boxed();

        // A rejected job is dropped here; its slot is handed off on drop.
        if self.pool.submit(admitted).is_err() {
            tracing::debug!("Download pool closed, dropping job for {}", self.host);
        }
    }

    /// Passes a vacated slot to the next waiting job or releases it
    fn hand_off(self: &Arc<Self>) {
        let mut state = self.lock_state();

        if self.pool.is_closed() {
            let abandoned = std::mem::take(&mut state.waiting);
            state.running = state.running.saturating_sub(1);
            drop(state);
            if !abandoned.is_empty() {
                tracing::debug!(
                    "Dropping {} queued jobs for {} after shutdown",
                    abandoned.len(),
                    self.host
                );
            }
            return;
        }

        match state.waiting.pop_front() {
            Some(next) => {
                drop(state);
                self.dispatch(next);
            }
            None => state.running -= 1,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ThrottleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One admission slot, handed off when the job owning it completes or is
/// dropped
struct Slot {
    throttle: Arc<HostThrottle>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.throttle.hand_off();
    }
}
