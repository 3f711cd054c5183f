//! Per-provider concurrency limiter (§4.4): a fixed pool of identifiable
//! slots, acquired with a bounded wait and released exactly once.
//!
//! Grounded on the teacher's domain-level semaphore limiter, but slots need
//! stable numeric identity here (the rate limiter keys on it), so this uses
//! an explicit slot array with lowest-idle-first selection instead of an
//! anonymous `tokio::sync::Semaphore` permit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

struct Inner {
    slots: Vec<AtomicBool>,
    notify: Notify,
}

/// A fixed pool of `N` slots for one provider.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    inner: Arc<Inner>,
}

/// An acquired slot. Released on drop if [`ConcurrencyLimiter::release`] (via
/// [`ConcurrencySlot::release`]) was never called explicitly — either path is
/// idempotent and safe to run exactly once.
pub struct ConcurrencySlot {
    inner: Arc<Inner>,
    id: usize,
    released: AtomicBool,
}

impl ConcurrencySlot {
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the slot to the pool. Calling this is optional — dropping the
    /// guard has the same effect — but doing it explicitly at the end of a
    /// handler makes the release point visible at the call site.
    pub fn release(self) {
        // Drop runs release_inner(); nothing else to do here.
        drop(self);
    }

    fn release_inner(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.slots[self.id].store(false, Ordering::Release);
        self.inner.notify.notify_waiters();
    }
}

impl Drop for ConcurrencySlot {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl ConcurrencyLimiter {
    #[must_use]
    pub fn new(n: usize) -> Self {
        let mut slots = Vec::with_capacity(n.max(1));
        for _ in 0..n.max(1) {
            slots.push(AtomicBool::new(false));
        }
        Self {
            inner: Arc::new(Inner {
                slots,
                notify: Notify::new(),
            }),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.slots.len()
    }

    #[must_use]
    pub fn in_use(&self) -> usize {
        self.inner
            .slots
            .iter()
            .filter(|s| s.load(Ordering::Acquire))
            .count()
    }

    fn try_claim_lowest_idle(&self) -> Option<usize> {
        for (id, slot) in self.inner.slots.iter().enumerate() {
            if slot
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Some(id);
            }
        }
        None
    }

    /// Returns an idle slot immediately if one exists, otherwise waits up to
    /// `wait_budget` for a release. Returns `None` on timeout, `Err` if `ct`
    /// fires first.
    pub async fn try_acquire(
        &self,
        wait_budget: Duration,
        ct: &CancellationToken,
    ) -> Result<Option<ConcurrencySlot>, Cancelled> {
        if let Some(id) = self.try_claim_lowest_idle() {
            return Ok(Some(self.wrap(id)));
        }

        let deadline = tokio::time::Instant::now() + wait_budget;
        loop {
            let notified = self.inner.notify.notified();
            if let Some(id) = self.try_claim_lowest_idle() {
                return Ok(Some(self.wrap(id)));
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            tokio::select! {
                _ = ct.cancelled() => return Err(Cancelled),
                result = timeout(remaining, notified) => {
                    if result.is_err() {
                        return Ok(None);
                    }
                    // woken by a release; loop back and retry the claim
                }
            }
        }
    }

    fn wrap(&self, id: usize) -> ConcurrencySlot {
        ConcurrencySlot {
            inner: Arc::clone(&self.inner),
            id,
            released: AtomicBool::new(false),
        }
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("operation cancelled while waiting for a concurrency slot")]
pub struct Cancelled;
