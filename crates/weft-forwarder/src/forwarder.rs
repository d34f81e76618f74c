//! Forwarder façade: the data-path and control-path surface of the engine.
//!
//! Data path: [`Forwarder::forward_payload`] and
//! [`Forwarder::forward_acknowledgement`], called from one I/O task per
//! ingress endpoint. Control path: route/unroute and the register/
//! unregister family, called from the control-plane handler. The idle
//! scanner and per-session unroute timeout workers feed the same
//! teardown entry points asynchronously.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use weft_core::{
    Acknowledgement, Address, Destination, ForwardError, LinkDestination, Payload, SessionId,
    XgressDestination,
};

use crate::faulter::Faulter;
use crate::metrics::ForwarderMetrics;
use crate::options::Options;
use crate::scanner::Scanner;
use crate::tables::{AddressMap, SessionTable};
use crate::trace::{TraceController, TraceEvent};

/// A route message from the control plane: the forwards to install for
/// one session.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub session_id: SessionId,
    pub forwards: Vec<ForwardSpec>,
}

/// One forward within a route: traffic arriving from `src_address` goes
/// to whatever is registered at `dst_address`.
#[derive(Debug, Clone)]
pub struct ForwardSpec {
    pub src_address: Address,
    pub dst_address: Address,
}

pub struct Forwarder {
    sessions: Arc<SessionTable>,
    destinations: Arc<AddressMap>,
    faulter: Option<Arc<Faulter>>,
    metrics: ForwarderMetrics,
    trace: TraceController,
    options: Arc<Options>,
    close_rx: watch::Receiver<bool>,
    unrouted_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Forwarder {
    /// Build the engine and bind the scanner to its session table.
    ///
    /// Must be called from within a tokio runtime: the scanner and every
    /// teardown dispatch run as spawned tasks. A `None` faulter is a
    /// supported configuration: forwarding fault reports are then logged
    /// and dropped.
    pub fn new(
        faulter: Option<Arc<Faulter>>,
        scanner: Scanner,
        options: Arc<Options>,
        close_rx: watch::Receiver<bool>,
    ) -> Arc<Self> {
        let forwarder = Arc::new(Self {
            sessions: Arc::new(SessionTable::new()),
            destinations: Arc::new(AddressMap::new()),
            faulter,
            metrics: ForwarderMetrics::new(),
            trace: TraceController::new(close_rx.clone()),
            options,
            close_rx,
            unrouted_tasks: Mutex::new(Vec::new()),
        });
        scanner.bind(Arc::clone(&forwarder));
        forwarder
    }

    #[must_use]
    pub fn metrics(&self) -> &ForwarderMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn trace_controller(&self) -> &TraceController {
        &self.trace
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    // -- Control path --

    /// Install the forwards for a session, merging with any existing
    /// forwards (last writer wins per source address). Repeating an
    /// identical route is indistinguishable from applying it once.
    pub fn route(&self, route: &RouteSpec) {
        let table = self
            .sessions
            .get_or_create_forward_table(route.session_id.clone());
        for forward in &route.forwards {
            table.set_forward_address(forward.src_address.clone(), forward.dst_address.clone());
        }
        tracing::debug!(
            session_id = %route.session_id,
            forwards = route.forwards.len(),
            "route installed"
        );
    }

    /// Tear down a session's forwarding state.
    ///
    /// Immediate: the forward table is gone when this returns and every
    /// subsequent lookup fails, though xgress teardown notifications run
    /// detached. Deferred: a timeout worker re-checks the session's
    /// xgress and reaps once it has been idle for a full check interval.
    /// Duplicate deferred unroutes spawn duplicate workers; each is
    /// individually safe.
    pub fn unroute(self: &Arc<Self>, session_id: &SessionId, immediate: bool) {
        if immediate {
            self.reap_session(session_id);
        } else {
            let forwarder = Arc::clone(self);
            let session_id = session_id.clone();
            // A zero-duration interval would panic the ticker.
            let interval = self
                .options
                .xgress_close_check_interval()
                .max(Duration::from_millis(1));
            tokio::spawn(async move {
                forwarder.unroute_timeout(session_id, interval).await;
            });
        }
    }

    /// End a session: unregister every destination linked to it. The
    /// single point that guarantees each xgress receives exactly one
    /// teardown notification.
    pub fn end_session(&self, session_id: &SessionId) {
        self.unregister_destinations(session_id);
    }

    /// Register a destination at `address` and link it to the session.
    /// The two steps are not atomic; readers may briefly see the
    /// destination before the session link exists.
    pub fn register_destination(
        &self,
        session_id: SessionId,
        address: Address,
        destination: Destination,
    ) {
        self.destinations
            .add_destination(address.clone(), destination);
        self.destinations.link_session(session_id, address);
    }

    /// Remove every destination linked to `session_id`, dispatching each
    /// xgress teardown notification on a detached task so slow endpoints
    /// cannot stall the control path.
    pub fn unregister_destinations(&self, session_id: &SessionId) {
        if let Some(addresses) = self.destinations.get_addresses_for_session(session_id) {
            for address in addresses {
                if let Some(destination) = self.destinations.remove_destination(&address) {
                    tracing::debug!(
                        address = %address,
                        session_id = %session_id,
                        "unregistering destination"
                    );
                    if let Some(xgress) = destination.as_xgress() {
                        let xgress = Arc::clone(xgress);
                        let handle = tokio::spawn(async move {
                            xgress.unrouted();
                        });
                        self.unrouted_tasks
                            .lock()
                            .expect("teardown task list poisoned")
                            .push(handle);
                    }
                } else {
                    tracing::debug!(
                        address = %address,
                        session_id = %session_id,
                        "no destination registered at address"
                    );
                }
            }
            self.destinations.unlink_session(session_id);
        } else {
            tracing::debug!(session_id = %session_id, "no addresses to unregister");
        }
    }

    /// Register a peer link under its identity token. Links are never
    /// linked to a session; their lifecycle is register/unregister only.
    pub fn register_link(&self, link: Arc<dyn LinkDestination>) {
        let token = link.identity_token();
        self.destinations
            .add_destination(token, Destination::Link(link));
    }

    pub fn unregister_link(&self, link: &Arc<dyn LinkDestination>) {
        self.destinations.remove_destination(&link.identity_token());
    }

    #[must_use]
    pub fn has_destination(&self, address: &Address) -> bool {
        self.destinations.has_destination(address)
    }

    // -- Data path --

    /// Forward a payload arriving from `src`.
    ///
    /// Lookup order is strict: session, then source forward, then
    /// destination. A miss at any step is the authoritative error and
    /// leaves every table untouched; send failures propagate verbatim.
    pub fn forward_payload(&self, src: &Address, payload: Payload) -> Result<(), ForwardError> {
        let session_id = payload.session_id().clone();
        // Rendered up front: the payload is consumed by the send below.
        let fields = payload.logger_fields().to_string();

        let Some(table) = self.sessions.get_forward_table(&session_id) else {
            self.metrics.forward_failures.increment(1);
            return Err(ForwardError::NoForwardTable {
                session_id,
                src: src.clone(),
            });
        };
        let Some(dst) = table.get_forward_address(src) else {
            self.metrics.forward_failures.increment(1);
            return Err(ForwardError::NoForwardAddress {
                session_id,
                src: src.clone(),
            });
        };
        let Some(destination) = self.destinations.get_destination(&dst) else {
            self.metrics.forward_failures.increment(1);
            return Err(ForwardError::NoDestination {
                session_id,
                src: src.clone(),
                dst,
            });
        };

        if let Err(err) = destination.send_payload(payload) {
            self.metrics.forward_failures.increment(1);
            return Err(ForwardError::Send(err));
        }

        self.metrics.payloads_forwarded.increment(1);
        tracing::debug!(src = %src, dst = %dst, fields = %fields, "forwarded payload");
        self.trace.publish(TraceEvent::PayloadForwarded {
            session_id,
            src: src.clone(),
            dst,
        });
        Ok(())
    }

    /// Forward an acknowledgement arriving from `src` along the same
    /// lookup chain as payloads.
    pub fn forward_acknowledgement(
        &self,
        src: &Address,
        ack: Acknowledgement,
    ) -> Result<(), ForwardError> {
        let session_id = ack.session_id().clone();

        let Some(table) = self.sessions.get_forward_table(&session_id) else {
            self.metrics.forward_failures.increment(1);
            return Err(ForwardError::NoForwardTable {
                session_id,
                src: src.clone(),
            });
        };
        let Some(dst) = table.get_forward_address(src) else {
            self.metrics.forward_failures.increment(1);
            return Err(ForwardError::NoForwardAddress {
                session_id,
                src: src.clone(),
            });
        };
        let Some(destination) = self.destinations.get_destination(&dst) else {
            self.metrics.forward_failures.increment(1);
            return Err(ForwardError::NoDestination {
                session_id,
                src: src.clone(),
                dst,
            });
        };

        if let Err(err) = destination.send_acknowledgement(ack) {
            self.metrics.forward_failures.increment(1);
            return Err(ForwardError::Send(err));
        }

        self.metrics.acknowledgements_forwarded.increment(1);
        tracing::debug!(src = %src, dst = %dst, session_id = %session_id, "forwarded acknowledgement");
        self.trace.publish(TraceEvent::AcknowledgementForwarded {
            session_id,
            src: src.clone(),
            dst,
        });
        Ok(())
    }

    /// Report that forwarding failed for a session. Delegates to the
    /// faulter when configured; otherwise the report is logged and
    /// dropped.
    pub fn report_forwarding_fault(&self, session_id: &SessionId) {
        match &self.faulter {
            Some(faulter) => {
                faulter.report(session_id.clone());
                self.metrics.faults_reported.increment(1);
            }
            None => {
                tracing::error!(
                    session_id = %session_id,
                    "no faulter configured, dropping forwarding fault report"
                );
            }
        }
    }

    // -- Observability --

    /// Human-readable snapshot of the session and destination tables.
    #[must_use]
    pub fn debug_dump(&self) -> String {
        format!(
            "{}{}",
            self.sessions.debug_dump(),
            self.destinations.debug_dump()
        )
    }

    /// Wait for the detached teardown notifications dispatched so far,
    /// bounding each by `timeout`. Intended for shutdown sequencing and
    /// tests; the data path never joins these tasks.
    pub async fn join_teardown(&self, timeout: Duration) {
        let handles: Vec<JoinHandle<()>> = self
            .unrouted_tasks
            .lock()
            .expect("teardown task list poisoned")
            .drain(..)
            .collect();
        for handle in handles {
            let _ = tokio::time::timeout(timeout, handle).await;
        }
    }

    // -- Shared teardown plumbing --

    /// Remove the session's forward table and end the session. Reaping
    /// is a map-remove, so repeating it is harmless.
    pub(crate) fn reap_session(&self, session_id: &SessionId) {
        self.sessions.remove_forward_table(session_id);
        self.end_session(session_id);
    }

    pub(crate) fn session_ids_snapshot(&self) -> Vec<SessionId> {
        self.sessions.session_ids()
    }

    /// The session's xgress destination, if any of its linked addresses
    /// holds one.
    pub(crate) fn xgress_for_session(
        &self,
        session_id: &SessionId,
    ) -> Option<Arc<dyn XgressDestination>> {
        let addresses = self.destinations.get_addresses_for_session(session_id)?;
        for address in addresses {
            if let Some(destination) = self.destinations.get_destination(&address)
                && let Some(xgress) = destination.as_xgress()
            {
                return Some(Arc::clone(xgress));
            }
        }
        None
    }

    /// Cooperative timeout worker for a deferred unroute.
    ///
    /// Re-checks the session's xgress on each tick and reaps once the
    /// endpoint has been idle for a full interval, or immediately if the
    /// endpoint is already gone. Exits without touching tables on the
    /// shared close signal. Safe under duplication: a second worker for
    /// the same session finds nothing to reap and ends the session
    /// against an empty address set.
    async fn unroute_timeout(self: Arc<Self>, session_id: SessionId, interval: Duration) {
        tracing::debug!(session_id = %session_id, "unroute timeout scheduled");
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        let mut close_rx = self.close_rx.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reap = match self.xgress_for_session(&session_id) {
                        Some(xgress) => {
                            let idle_ms = now_millis() - xgress.time_of_last_rx_from_link();
                            idle_ms >= interval.as_millis() as i64
                        }
                        None => true,
                    };
                    if reap {
                        tracing::debug!(session_id = %session_id, "unroute timeout reaping session");
                        self.reap_session(&session_id);
                        self.metrics.sessions_reaped.increment(1);
                        return;
                    }
                }

                _ = close_rx.changed() => return,
            }
        }
    }
}

/// Milliseconds since the Unix epoch, the clock xgress endpoints stamp
/// their last-receive times with.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
