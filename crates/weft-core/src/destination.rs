//! Deliverable destination handles: local xgress endpoints and peer links.
//!
//! Every destination can accept payloads and acknowledgements. Xgress
//! endpoints additionally expose lifecycle operations the forwarder needs
//! for teardown and idle detection; those are reachable only once the
//! variant is known (see [`Destination::as_xgress`]).

use std::fmt;
use std::sync::Arc;

use crate::error::SendError;
use crate::payload::{Acknowledgement, Payload};
use crate::types::Address;

/// Send capability shared by every destination variant.
///
/// `send_payload` and `send_acknowledgement` may block on an outbound
/// queue or network write; they are the only blocking calls on the hot
/// path, and that blocking is the implementation's responsibility.
pub trait SendHandle: Send + Sync {
    fn send_payload(&self, payload: Payload) -> Result<(), SendError>;
    fn send_acknowledgement(&self, ack: Acknowledgement) -> Result<(), SendError>;
}

/// A local attachment point where user traffic enters or leaves the
/// fabric at this router.
pub trait XgressDestination: SendHandle {
    /// Teardown notification. The forwarder calls this exactly once per
    /// registration, on a detached task, when the owning session ends.
    fn unrouted(&self);

    /// Begin processing traffic.
    fn start(&self);

    /// Whether this endpoint terminates the circuit.
    fn is_terminator(&self) -> bool;

    /// Human-readable label for diagnostics.
    fn label(&self) -> String;

    /// Milliseconds since epoch of the last receive from the link side.
    /// Drives idle detection in the scanner and unroute timeout worker.
    fn time_of_last_rx_from_link(&self) -> i64;
}

/// A transport to a peer router. Its identity token doubles as its
/// address in the destination registry.
pub trait LinkDestination: SendHandle {
    fn identity_token(&self) -> Address;
}

/// A deliverable endpoint: either a local xgress endpoint or a peer link.
#[derive(Clone)]
pub enum Destination {
    Xgress(Arc<dyn XgressDestination>),
    Link(Arc<dyn LinkDestination>),
}

impl Destination {
    pub fn send_payload(&self, payload: Payload) -> Result<(), SendError> {
        match self {
            Self::Xgress(xgress) => xgress.send_payload(payload),
            Self::Link(link) => link.send_payload(payload),
        }
    }

    pub fn send_acknowledgement(&self, ack: Acknowledgement) -> Result<(), SendError> {
        match self {
            Self::Xgress(xgress) => xgress.send_acknowledgement(ack),
            Self::Link(link) => link.send_acknowledgement(ack),
        }
    }

    /// The xgress-only surface, available once the variant is known.
    #[must_use]
    pub fn as_xgress(&self) -> Option<&Arc<dyn XgressDestination>> {
        match self {
            Self::Xgress(xgress) => Some(xgress),
            Self::Link(_) => None,
        }
    }

    #[must_use]
    pub fn is_xgress(&self) -> bool {
        matches!(self, Self::Xgress(_))
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xgress(xgress) => write!(f, "Xgress({})", xgress.label()),
            Self::Link(link) => write!(f, "Link({})", link.identity_token()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionId;
    use std::sync::Mutex;

    struct StubXgress {
        received: Mutex<Vec<Payload>>,
    }

    impl SendHandle for StubXgress {
        fn send_payload(&self, payload: Payload) -> Result<(), SendError> {
            self.received.lock().expect("lock").push(payload);
            Ok(())
        }

        fn send_acknowledgement(&self, _ack: Acknowledgement) -> Result<(), SendError> {
            Ok(())
        }
    }

    impl XgressDestination for StubXgress {
        fn unrouted(&self) {}
        fn start(&self) {}
        fn is_terminator(&self) -> bool {
            false
        }
        fn label(&self) -> String {
            "stub".to_string()
        }
        fn time_of_last_rx_from_link(&self) -> i64 {
            0
        }
    }

    struct StubLink;

    impl SendHandle for StubLink {
        fn send_payload(&self, _payload: Payload) -> Result<(), SendError> {
            Err(SendError::Closed)
        }

        fn send_acknowledgement(&self, _ack: Acknowledgement) -> Result<(), SendError> {
            Err(SendError::Closed)
        }
    }

    impl LinkDestination for StubLink {
        fn identity_token(&self) -> Address {
            Address::from("l/7")
        }
    }

    fn payload() -> Payload {
        Payload::new(SessionId::from("s1"), 0, vec![0xAB])
    }

    #[test]
    fn xgress_variant_dispatches_send() {
        let stub = Arc::new(StubXgress {
            received: Mutex::new(Vec::new()),
        });
        let dest = Destination::Xgress(stub.clone());

        dest.send_payload(payload()).unwrap();
        assert_eq!(stub.received.lock().unwrap().len(), 1);
    }

    #[test]
    fn link_variant_propagates_send_error() {
        let dest = Destination::Link(Arc::new(StubLink));
        assert_eq!(dest.send_payload(payload()), Err(SendError::Closed));
    }

    #[test]
    fn as_xgress_gates_variant_specific_operations() {
        let xgress = Destination::Xgress(Arc::new(StubXgress {
            received: Mutex::new(Vec::new()),
        }));
        let link = Destination::Link(Arc::new(StubLink));

        assert!(xgress.is_xgress());
        assert_eq!(xgress.as_xgress().unwrap().label(), "stub");

        assert!(!link.is_xgress());
        assert!(link.as_xgress().is_none());
    }

    #[test]
    fn debug_names_the_variant() {
        let link = Destination::Link(Arc::new(StubLink));
        assert_eq!(format!("{link:?}"), "Link(l/7)");
    }
}
