//! Counted group of outstanding fetch tasks.
//!
//! Every fetch task holds an `InFlightGuard` for its whole lifetime. The
//! count drives the bounded fan-out policy and lets shutdown optionally
//! wait for outstanding fetches to finish.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Default)]
struct Inner {
    count: AtomicUsize,
    idle: Notify,
}

/// Tracks outstanding fetch tasks. Clones share the same count.
#[derive(Clone, Default)]
pub struct InFlight {
    inner: Arc<Inner>,
}

/// Held by one outstanding task; dropping it leaves the group.
pub struct InFlightGuard {
    inner: Arc<Inner>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the group. The task counts as outstanding until the guard drops.
    pub fn enter(&self) -> InFlightGuard {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Wait until no task is outstanding.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent last drop can't be missed.
            notified.as_mut().enable();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait up to `timeout` for the group to drain. Returns whether it did.
    pub async fn drain(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_idle()).await.is_ok()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.inner.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_count_up_and_down() {
        let group = InFlight::new();
        let a = group.enter();
        let b = group.clone().enter();
        assert_eq!(group.count(), 2);

        drop(a);
        assert_eq!(group.count(), 1);
        drop(b);
        assert_eq!(group.count(), 0);
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_when_empty() {
        InFlight::new().wait_idle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_last_guard() {
        let group = InFlight::new();
        let guard = group.enter();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            drop(guard);
        });

        assert!(group.drain(Duration::from_secs(10)).await);
        assert_eq!(group.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_times_out_with_outstanding_guard() {
        let group = InFlight::new();
        let _guard = group.enter();

        assert!(!group.drain(Duration::from_secs(1)).await);
        assert_eq!(group.count(), 1);
    }
}
