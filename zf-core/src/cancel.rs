//! Cooperative shutdown signalling
//!
//! One cloneable token shared between the signal handler and the control
//! loop. Edge-triggered and idempotent: the first `signal` wins, later
//! calls are no-ops, and the loop observes it only at its sleep point and
//! tick boundary, so an in-flight hardware write is never torn.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Cloneable cancellation handle for the control loop
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    signalled: AtomicBool,
    notify: Notify,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Safe to call from any thread; repeated calls have
    /// no additional effect.
    pub fn signal(&self) {
        if !self.inner.signalled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// True once shutdown has been requested
    pub fn is_signalled(&self) -> bool {
        self.inner.signalled.load(Ordering::SeqCst)
    }

    /// Wait until shutdown is requested; returns immediately if it already was
    pub async fn cancelled(&self) {
        loop {
            if self.is_signalled() {
                return;
            }
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before re-checking the flag, otherwise a signal
            // landing between the check and the await is lost.
            notified.as_mut().enable();
            if self.is_signalled() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_is_idempotent() {
        let token = ShutdownToken::new();
        assert!(!token.is_signalled());
        token.signal();
        token.signal();
        assert!(token.is_signalled());
    }

    #[test]
    fn test_clones_share_state() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        clone.signal();
        assert!(token.is_signalled());
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_already_signalled() {
        let token = ShutdownToken::new();
        token.signal();
        token.cancelled().await;
    }

    #[tokio::test]
    async fn test_cancelled_wakes_on_signal() {
        let token = ShutdownToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::task::yield_now().await;
        token.signal();
        handle.await.unwrap();
    }
}
