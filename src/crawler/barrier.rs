//! End-of-level rendezvous
//!
//! Every task belonging to a breadth-first level holds a [`Registration`].
//! The orchestrator holds the initial one and gives it up in
//! [`LevelBarrier::arrive_and_await_advance`], which returns once every
//! other registration has been dropped.
//!
//! Registrations must be taken on the submitting side, before the task is
//! handed to a pool. Otherwise a sibling finishing early could bring the
//! count to zero while work is still being submitted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Counts outstanding tasks of one level
#[derive(Debug)]
pub struct LevelBarrier {
    outstanding: AtomicUsize,
    drained: Notify,
}

impl LevelBarrier {
    /// Creates a barrier holding the orchestrator's own registration
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            outstanding: AtomicUsize::new(1),
            drained: Notify::new(),
        })
    }

    /// Registers one more task with the level
    pub fn register(self: &Arc<Self>) -> Registration {
        let outstanding = self.outstanding.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!("Barrier register, outstanding = {}", outstanding);
        Registration {
            barrier: Arc::clone(self),
        }
    }

    /// Current number of registrations, the orchestrator's included
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Drops the orchestrator's registration and waits for the level to drain
    ///
    /// Call once per barrier.
    pub async fn arrive_and_await_advance(&self) {
        self.arrive();
        while self.outstanding() != 0 {
            self.drained.notified().await;
        }
    }

    fn arrive(&self) {
        let previous = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!("Barrier arrive, outstanding = {}", previous - 1);
        if previous == 1 {
            self.drained.notify_one();
        }
    }
}

/// A task's membership in a [`LevelBarrier`], released on drop
#[derive(Debug)]
#[must_use = "dropping a registration immediately deregisters the task"]
pub struct Registration {
    barrier: Arc<LevelBarrier>,
}

impl Registration {
    /// Deregisters the task explicitly
    pub fn arrive_and_deregister(self) {
        drop(self);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.barrier.arrive();
    }
}
