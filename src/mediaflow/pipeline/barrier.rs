//! Completion barrier coupling a trigger's publishes to its listeners' writes
//!
//! A barrier is armed when a trigger starts, counts completions signalled by
//! listeners, and is either released (every dispatched record processed) or
//! expired (the bounded wait elapsed first). Expiry is not an error.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

pub const DEFAULT_BARRIER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierState {
    Armed,
    Released,
    Expired,
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// Every dispatched record was processed; `failed` of them did not persist
    Released { failed: usize },
    /// The wait elapsed with `remaining` records still unprocessed
    Expired { remaining: usize },
}

impl BarrierOutcome {
    pub fn is_released(&self) -> bool {
        matches!(self, BarrierOutcome::Released { .. })
    }
}

#[derive(Debug)]
pub struct CompletionBarrier {
    target: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    sealed: AtomicBool,
    expired: AtomicBool,
    notify: Notify,
}

impl CompletionBarrier {
    /// Armed with a fixed count
    pub fn new(count: usize) -> Self {
        Self {
            target: AtomicUsize::new(count),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            sealed: AtomicBool::new(true),
            expired: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Armed with a count that grows with [`dispatched`](Self::dispatched) until [`seal`](Self::seal)
    pub fn open() -> Self {
        let barrier = Self::new(0);
        barrier.sealed.store(false, Ordering::SeqCst);
        barrier
    }

    /// One more record is expected
    pub fn dispatched(&self) {
        self.target.fetch_add(1, Ordering::SeqCst);
    }

    /// No further records will be dispatched
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn count_down(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// A record was processed but not persisted
    pub fn count_down_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.count_down();
    }

    pub fn dispatched_count(&self) -> usize {
        self.target.load(Ordering::SeqCst)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn failed_count(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.dispatched_count()
            .saturating_sub(self.completed_count())
    }

    fn is_released(&self) -> bool {
        self.sealed.load(Ordering::SeqCst) && self.remaining() == 0
    }

    pub fn state(&self) -> BarrierState {
        if self.is_released() {
            BarrierState::Released
        } else if self.expired.load(Ordering::SeqCst) {
            BarrierState::Expired
        } else {
            BarrierState::Armed
        }
    }

    /// Waits until released or until `timeout` elapses
    pub async fn wait(&self, timeout: Duration) -> BarrierOutcome {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a signal between the check and the await is not lost.
            notified.as_mut().enable();

            if self.is_released() {
                return BarrierOutcome::Released {
                    failed: self.failed_count(),
                };
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                if self.is_released() {
                    return BarrierOutcome::Released {
                        failed: self.failed_count(),
                    };
                }
                self.expired.store(true, Ordering::SeqCst);
                return BarrierOutcome::Expired {
                    remaining: self.remaining(),
                };
            }
        }
    }
}

/// Live barriers by batch id, so listeners can find the trigger they report to
#[derive(Debug, Default)]
pub struct BarrierRegistry {
    barriers: DashMap<String, Arc<CompletionBarrier>>,
}

impl BarrierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, batch_id: impl Into<String>, barrier: CompletionBarrier) -> Arc<CompletionBarrier> {
        let barrier = Arc::new(barrier);
        self.barriers.insert(batch_id.into(), Arc::clone(&barrier));
        barrier
    }

    pub fn get(&self, batch_id: &str) -> Option<Arc<CompletionBarrier>> {
        self.barriers.get(batch_id).map(|b| Arc::clone(b.value()))
    }

    pub fn discard(&self, batch_id: &str) -> Option<Arc<CompletionBarrier>> {
        self.barriers.remove(batch_id).map(|(_, barrier)| barrier)
    }

    pub fn len(&self) -> usize {
        self.barriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.barriers.is_empty()
    }
}
