//! Cooperative cancellation signal.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A one-way flag that also wakes anything awaiting it.
///
/// Setting it is safe from any thread, including a signal handler thread.
#[derive(Debug, Default)]
pub struct CancelFlag {
    flag: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns `true` only for the call that raised it.
    pub fn cancel(&self) -> bool {
        let first = !self.flag.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolve once the flag is raised.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking so a concurrent cancel is not missed
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_idempotent() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        assert!(flag.cancel());
        assert!(!flag.cancel());
        assert!(flag.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_set() {
        let flag = CancelFlag::new();
        flag.cancel();
        tokio::time::timeout(Duration::from_secs(1), flag.cancelled())
            .await
            .expect("should resolve");
    }

    #[tokio::test]
    async fn test_cancel_from_another_thread_wakes_waiter() {
        let flag = Arc::new(CancelFlag::new());
        let remote = Arc::clone(&flag);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        tokio::time::timeout(Duration::from_secs(2), flag.cancelled())
            .await
            .expect("waiter should wake");
    }
}
