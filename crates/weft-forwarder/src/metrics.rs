//! Data-path metrics instrumentation.
//!
//! Counters are resolved once against whatever recorder the host process
//! installed; the engine only increments. With no recorder installed the
//! handles are no-ops, which keeps tests and embedded uses free of setup.

use metrics::Counter;

/// Pre-resolved counters for the forwarding hot path.
#[derive(Clone)]
pub struct ForwarderMetrics {
    pub payloads_forwarded: Counter,
    pub acknowledgements_forwarded: Counter,
    pub forward_failures: Counter,
    pub sessions_reaped: Counter,
    pub faults_reported: Counter,
    pub fault_reports_dropped: Counter,
}

impl ForwarderMetrics {
    pub fn new() -> Self {
        Self {
            payloads_forwarded: metrics::counter!("weft_payloads_forwarded"),
            acknowledgements_forwarded: metrics::counter!("weft_acknowledgements_forwarded"),
            forward_failures: metrics::counter!("weft_forward_failures"),
            sessions_reaped: metrics::counter!("weft_sessions_reaped"),
            faults_reported: metrics::counter!("weft_faults_reported"),
            fault_reports_dropped: metrics::counter!("weft_fault_reports_dropped"),
        }
    }
}

impl Default for ForwarderMetrics {
    fn default() -> Self {
        Self::new()
    }
}
