//! Fault-reporting sidecar.
//!
//! When the data path cannot forward for a session, the session id is
//! queued here. A background task deduplicates queued ids within a flush
//! window and emits one batched report per window to the control plane,
//! which owns re-convergence.

use std::collections::HashSet;
use std::sync::Arc;

use metrics::Counter;
use tokio::sync::{mpsc, watch};

use weft_core::SessionId;

use crate::metrics::ForwarderMetrics;
use crate::options::Options;

/// A batch of session ids this router could not forward for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    pub session_ids: Vec<SessionId>,
}

/// Control-plane sink for fault reports. `accept_fault` is called from
/// the flush task; implementations should hand off rather than block.
pub trait FaultSink: Send + Sync {
    fn accept_fault(&self, report: FaultReport);
}

/// Batching, deduplicating sink for undeliverable-session reports.
///
/// The submission queue is bounded; when forwarding failures outrun the
/// flush loop, excess reports are dropped with a warning. Loss is safe:
/// the control plane re-converges from its own state.
pub struct Faulter {
    report_tx: mpsc::Sender<SessionId>,
    dropped: Counter,
}

impl Faulter {
    /// Spawn the flush task and return a handle for report submission.
    pub fn new(
        sink: Arc<dyn FaultSink>,
        options: &Options,
        close_rx: watch::Receiver<bool>,
    ) -> Arc<Self> {
        let (report_tx, report_rx) = mpsc::channel(options.fault_report_capacity.max(1));
        // A zero-duration interval would panic the ticker.
        let flush_interval = options
            .fault_flush_interval()
            .max(std::time::Duration::from_millis(1));
        tokio::spawn(flush_loop(sink, report_rx, flush_interval, close_rx));
        Arc::new(Self {
            report_tx,
            dropped: ForwarderMetrics::new().fault_reports_dropped,
        })
    }

    /// Queue a session id for the next fault flush. Never blocks.
    pub fn report(&self, session_id: SessionId) {
        if let Err(err) = self.report_tx.try_send(session_id) {
            match err {
                mpsc::error::TrySendError::Full(session_id) => {
                    self.dropped.increment(1);
                    tracing::warn!(session_id = %session_id, "fault queue full, dropping report");
                }
                mpsc::error::TrySendError::Closed(session_id) => {
                    tracing::warn!(session_id = %session_id, "fault flush task gone, dropping report");
                }
            }
        }
    }
}

async fn flush_loop(
    sink: Arc<dyn FaultSink>,
    mut report_rx: mpsc::Receiver<SessionId>,
    flush_interval: std::time::Duration,
    mut close_rx: watch::Receiver<bool>,
) {
    let mut pending: HashSet<SessionId> = HashSet::new();
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            report = report_rx.recv() => {
                match report {
                    Some(session_id) => {
                        pending.insert(session_id);
                    }
                    None => return,
                }
            }

            _ = ticker.tick() => {
                if !pending.is_empty() {
                    let session_ids: Vec<SessionId> = pending.drain().collect();
                    tracing::debug!(count = session_ids.len(), "flushing forwarding faults");
                    sink.accept_fault(FaultReport { session_ids });
                }
            }

            _ = close_rx.changed() => return,
        }
    }
}
