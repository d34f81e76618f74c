//! Publish-subscribe fan-out for traffic-trace events.
//!
//! Publishing from the hot path is guaranteed non-blocking: a subscriber
//! whose queue is full misses the event, subscribers that went away are
//! pruned on the next publish, and the shared close signal silences the
//! controller entirely.

use std::sync::Mutex;

use tokio::sync::{mpsc, watch};

use weft_core::{Address, SessionId};

/// A data-path trace event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    PayloadForwarded {
        session_id: SessionId,
        src: Address,
        dst: Address,
    },
    AcknowledgementForwarded {
        session_id: SessionId,
        src: Address,
        dst: Address,
    },
}

/// Best-effort pub-sub controller for data-path tracing.
pub struct TraceController {
    subscribers: Mutex<Vec<mpsc::Sender<TraceEvent>>>,
    close_rx: watch::Receiver<bool>,
}

impl TraceController {
    pub fn new(close_rx: watch::Receiver<bool>) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            close_rx,
        }
    }

    /// Register a subscriber with the given queue depth.
    pub fn subscribe(&self, depth: usize) -> mpsc::Receiver<TraceEvent> {
        let (tx, rx) = mpsc::channel(depth.max(1));
        self.subscribers
            .lock()
            .expect("subscriber list poisoned")
            .push(tx);
        rx
    }

    /// Publish an event to every live subscriber. Never blocks; a full
    /// subscriber queue drops the event for that subscriber only.
    pub fn publish(&self, event: TraceEvent) {
        if *self.close_rx.borrow() {
            return;
        }

        let mut subscribers = self
            .subscribers
            .lock()
            .expect("subscriber list poisoned");
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("trace subscriber queue full, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber list poisoned")
            .len()
    }
}
