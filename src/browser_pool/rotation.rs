//! Generic single-slot rotation policy (§4.3): the value currently held is
//! looked up and, if it reports `needs_rotation`, retired and replaced via
//! `launch`. Split out of [`super::BrowserContextPool`] so the acquire →
//! detect-staleness → retire → relaunch sequence is testable against a fake
//! context, without a live browser.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::ProviderError;

#[async_trait]
pub trait RotatableContext: Send + Sync {
    /// Whether this context should be retired before its next use.
    fn needs_rotation(&self) -> bool;

    /// Tears the context down. Called at most once per context.
    async fn retire(&self);
}

pub struct RotatingSlot<T> {
    held: Mutex<Option<Arc<T>>>,
}

impl<T: RotatableContext> RotatingSlot<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { held: Mutex::new(None) }
    }

    /// Returns the held context, rotating it first if empty or stale.
    /// Serialized via the slot's own mutex, so two concurrent callers never
    /// launch two replacement contexts.
    pub async fn acquire<F, Fut>(&self, launch: F) -> Result<Arc<T>, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut guard = self.held.lock().await;

        let needs_rotation = match guard.as_ref() {
            Some(ctx) => ctx.needs_rotation(),
            None => true,
        };

        if needs_rotation {
            if let Some(old) = guard.take() {
                old.retire().await;
            }
            let fresh = Arc::new(launch().await?);
            *guard = Some(fresh);
        }

        Ok(Arc::clone(guard.as_ref().expect("just set above")))
    }

    pub async fn close(&self) {
        if let Some(ctx) = self.held.lock().await.take() {
            ctx.retire().await;
        }
    }
}

impl<T> Default for RotatingSlot<T> {
    fn default() -> Self {
        Self { held: Mutex::new(None) }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    struct FakeContext {
        id: usize,
        stale: AtomicBool,
        retired: AtomicBool,
    }

    #[async_trait]
    impl RotatableContext for FakeContext {
        fn needs_rotation(&self) -> bool {
            self.stale.load(Ordering::SeqCst)
        }

        async fn retire(&self) {
            self.retired.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn first_acquire_launches() {
        let slot = RotatingSlot::new();
        let launches = AtomicUsize::new(0);
        let ctx = slot
            .acquire(|| async {
                launches.fetch_add(1, Ordering::SeqCst);
                Ok(FakeContext {
                    id: 1,
                    stale: AtomicBool::new(false),
                    retired: AtomicBool::new(false),
                })
            })
            .await
            .unwrap();
        assert_eq!(ctx.id, 1);
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fresh_context_is_reused_without_relaunch() {
        let slot = RotatingSlot::new();
        let launches = AtomicUsize::new(0);
        let launch = || async {
            let n = launches.fetch_add(1, Ordering::SeqCst);
            Ok(FakeContext {
                id: n,
                stale: AtomicBool::new(false),
                retired: AtomicBool::new(false),
            })
        };

        let first = slot.acquire(launch).await.unwrap();
        let second = slot.acquire(launch).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_context_is_retired_and_replaced() {
        let slot = RotatingSlot::new();
        let launches = AtomicUsize::new(0);
        let launch = || async {
            let n = launches.fetch_add(1, Ordering::SeqCst);
            Ok(FakeContext {
                id: n,
                stale: AtomicBool::new(false),
                retired: AtomicBool::new(false),
            })
        };

        let first = slot.acquire(launch).await.unwrap();
        first.stale.store(true, Ordering::SeqCst);

        let second = slot.acquire(launch).await.unwrap();
        assert_ne!(first.id, second.id);
        assert!(first.retired.load(Ordering::SeqCst));
    }
}
