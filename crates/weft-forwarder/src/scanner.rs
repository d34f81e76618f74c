//! Idle-session scanner.
//!
//! A periodic sweeper that reaps sessions whose xgress endpoint has gone
//! quiet past the configured idle threshold. Each sweep works from a
//! snapshot of the session table; sessions added mid-sweep are picked up
//! on the next tick. Sessions without a local xgress (pure transit legs)
//! are left alone; their lifecycle belongs to the control plane.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::forwarder::{Forwarder, now_millis};
use crate::options::Options;

pub struct Scanner {
    scan_interval: Duration,
    idle_timeout: Duration,
    close_rx: watch::Receiver<bool>,
}

impl Scanner {
    pub fn new(options: &Options, close_rx: watch::Receiver<bool>) -> Self {
        Self {
            scan_interval: options.idle_scan_interval(),
            idle_timeout: options.idle_session_timeout(),
            close_rx,
        }
    }

    /// Attach the scanner to the engine and start sweeping. A zero scan
    /// interval disables the scanner entirely.
    pub(crate) fn bind(self, forwarder: Arc<Forwarder>) {
        if self.scan_interval.is_zero() {
            tracing::debug!("idle scanner disabled");
            return;
        }
        tokio::spawn(self.run(forwarder));
    }

    async fn run(mut self, forwarder: Arc<Forwarder>) {
        let mut ticker = tokio::time::interval(self.scan_interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.scan(&forwarder);
                }

                _ = self.close_rx.changed() => return,
            }
        }
    }

    fn scan(&self, forwarder: &Forwarder) {
        let idle_threshold_ms = self.idle_timeout.as_millis() as i64;
        let now = now_millis();
        let mut reaped = 0usize;

        for session_id in forwarder.session_ids_snapshot() {
            let Some(xgress) = forwarder.xgress_for_session(&session_id) else {
                continue;
            };
            if now - xgress.time_of_last_rx_from_link() >= idle_threshold_ms {
                tracing::info!(session_id = %session_id, "reaping idle session");
                forwarder.reap_session(&session_id);
                forwarder.metrics().sessions_reaped.increment(1);
                reaped += 1;
            }
        }

        if reaped > 0 {
            tracing::debug!(reaped, "idle scan complete");
        }
    }
}
