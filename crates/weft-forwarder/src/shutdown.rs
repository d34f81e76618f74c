//! Process-wide close-notify signal.
//!
//! The scanner, trace controller, faulter, and every unroute timeout
//! worker subscribe to the same signal. Receipt is a cancellation: each
//! task exits promptly without touching the tables.

use tokio::sync::watch;

/// Shared shutdown signal backed by a `watch` channel.
#[derive(Debug)]
pub struct CloseSignal {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl CloseSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Receiver for one cooperating task. Tasks check it in a
    /// `tokio::select!` branch via `changed()`.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    /// Signal shutdown. Idempotent.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.rx.borrow()
    }
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_open() {
        let signal = CloseSignal::new();
        assert!(!signal.is_closed());
        assert!(!*signal.subscribe().borrow());
    }

    #[test]
    fn trigger_is_visible_to_subscribers() {
        let signal = CloseSignal::new();
        let rx = signal.subscribe();

        signal.trigger();
        assert!(signal.is_closed());
        assert!(*rx.borrow());
    }

    #[test]
    fn trigger_is_idempotent() {
        let signal = CloseSignal::new();
        signal.trigger();
        signal.trigger();
        assert!(signal.is_closed());
    }

    #[test]
    fn subscribe_after_trigger_sees_closed() {
        let signal = CloseSignal::new();
        signal.trigger();
        assert!(*signal.subscribe().borrow());
    }

    #[tokio::test]
    async fn changed_wakes_a_waiting_task() {
        let signal = CloseSignal::new();
        let mut rx = signal.subscribe();

        let waiter = tokio::spawn(async move {
            let _ = rx.changed().await;
        });

        signal.trigger();
        waiter.await.expect("waiter should finish");
    }
}
