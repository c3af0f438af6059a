//! Per-list access locks.
//!
//! Guards multi-step range work (read bounds, fetch a gap remotely, write the
//! result back) against a sync batch rewriting the same list concurrently.
//!
//! # State
//!
//! ```text
//! (unlocked) ─── acquire() ──→ locked ─── release() ──→ (unlocked)
//!                   │  ↑                      │
//!                 queue └──── grant to oldest waiter
//! ```
//!
//! A list id is locked while it has an entry in the table; the entry is the
//! FIFO queue of waiters. Release hands the lock directly to the oldest live
//! waiter, so exactly one waiter wakes and no newcomer can overtake it.
//! Waiters whose acquire future was dropped are skipped.

use rangecache_core::{ListId, RangeLocking};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

type WaitQueue = VecDeque<oneshot::Sender<()>>;

#[derive(Debug, Default)]
struct LockTableInner {
    slots: Mutex<HashMap<ListId, WaitQueue>>,
}

impl LockTableInner {
    // Critical sections never panic, so a poisoned table is still consistent.
    fn slots(&self) -> MutexGuard<'_, HashMap<ListId, WaitQueue>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, list_id: &ListId) {
        let mut slots = self.slots();
        let Some(queue) = slots.get_mut(list_id) else {
            tracing::warn!(list_id = %list_id, "Release of a list that is not locked");
            return;
        };
        while let Some(waiter) = queue.pop_front() {
            if waiter.send(()).is_ok() {
                tracing::trace!(list_id = %list_id, "Range lock handed to next waiter");
                return;
            }
        }
        slots.remove(list_id);
        tracing::trace!(list_id = %list_id, "Range lock released");
    }
}

/// Keyed mutual exclusion over list ids.
#[derive(Debug, Clone)]
pub struct RangeLockTable {
    inner: Arc<LockTableInner>,
    mode: RangeLocking,
    slow_lock_threshold: Duration,
}

impl RangeLockTable {
    pub fn new(mode: RangeLocking, slow_lock_threshold: Duration) -> Self {
        Self {
            inner: Arc::new(LockTableInner::default()),
            mode,
            slow_lock_threshold,
        }
    }

    pub fn mode(&self) -> RangeLocking {
        self.mode
    }

    /// Wait until `list_id` is unlocked, then lock it.
    ///
    /// Only tasks contending for the same list id wait on each other. The
    /// returned guard releases the lock when dropped. Dropping this future
    /// while it waits gives up the place in the queue without leaking the
    /// lock, even if the grant already arrived.
    pub async fn acquire(&self, list_id: &ListId) -> RangeLockGuard {
        if self.mode == RangeLocking::Disabled {
            return RangeLockGuard {
                list_id: list_id.clone(),
                table: None,
            };
        }

        let started = Instant::now();
        loop {
            let receiver = {
                let mut slots = self.inner.slots();
                match slots.entry(list_id.clone()) {
                    Entry::Vacant(vacant) => {
                        vacant.insert(VecDeque::new());
                        break;
                    }
                    Entry::Occupied(mut occupied) => {
                        let (sender, receiver) = oneshot::channel();
                        occupied.get_mut().push_back(sender);
                        receiver
                    }
                }
            };

            let mut pending = PendingGrant {
                receiver: Some(receiver),
                inner: &self.inner,
                list_id,
            };
            if pending.wait().await {
                break;
            }
            // The queue was dropped without granting; look at the table again.
        }

        let waited = started.elapsed();
        if waited > self.slow_lock_threshold {
            tracing::warn!(
                list_id = %list_id,
                waited_ms = waited.as_millis() as u64,
                "Slow range lock acquisition"
            );
        }

        RangeLockGuard {
            list_id: list_id.clone(),
            table: Some(Arc::clone(&self.inner)),
        }
    }

    /// Whether `list_id` is currently held.
    pub fn is_locked(&self, list_id: &ListId) -> bool {
        self.inner.slots().contains_key(list_id)
    }

    /// Number of tasks queued for `list_id`, including ones whose acquire was
    /// abandoned but not yet skipped.
    pub fn waiter_count(&self, list_id: &ListId) -> usize {
        self.inner
            .slots()
            .get(list_id)
            .map(VecDeque::len)
            .unwrap_or(0)
    }
}

/// A waiter's pending grant. If dropped after the grant was sent but before
/// it was observed, the lock is passed on.
struct PendingGrant<'a> {
    receiver: Option<oneshot::Receiver<()>>,
    inner: &'a LockTableInner,
    list_id: &'a ListId,
}

impl PendingGrant<'_> {
    async fn wait(&mut self) -> bool {
        let Some(receiver) = self.receiver.as_mut() else {
            return false;
        };
        let granted = receiver.await.is_ok();
        self.receiver = None;
        granted
    }
}

impl Drop for PendingGrant<'_> {
    fn drop(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close();
            if receiver.try_recv().is_ok() {
                self.inner.release(self.list_id);
            }
        }
    }
}

/// Scoped ownership of a list's range lock.
#[must_use = "the range lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct RangeLockGuard {
    list_id: ListId,
    table: Option<Arc<LockTableInner>>,
}

impl RangeLockGuard {
    pub fn list_id(&self) -> &ListId {
        &self.list_id
    }

    /// Release explicitly. Equivalent to dropping the guard.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for RangeLockGuard {
    fn drop(&mut self) {
        if let Some(table) = self.table.take() {
            table.release(&self.list_id);
        }
    }
}
