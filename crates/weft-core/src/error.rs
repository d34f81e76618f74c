//! Error surface of the forwarding engine.

use crate::types::{Address, SessionId};

/// Failure a destination reports from its send path.
///
/// A send failure says nothing about the destination's registration: the
/// engine removes destinations only through explicit unregister or
/// unroute, never as a reaction to a failed send.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("destination closed")]
    Closed,

    #[error("outbound queue full")]
    QueueFull,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors the data path reports to callers.
///
/// The lookup chain is strict: session, then source forward, then
/// destination. A miss at any step is the authoritative error, and no
/// lookup failure ever mutates a table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardError {
    #[error("no forward table for session={session_id} src={src}")]
    NoForwardTable { session_id: SessionId, src: Address },

    #[error("no destination address for session={session_id} src={src}")]
    NoForwardAddress { session_id: SessionId, src: Address },

    #[error("no destination for session={session_id} src={src} dst={dst}")]
    NoDestination {
        session_id: SessionId,
        src: Address,
        dst: Address,
    },

    #[error("send failed: {0}")]
    Send(#[from] SendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_error_display() {
        let err = ForwardError::NoForwardTable {
            session_id: SessionId::from("s1"),
            src: Address::from("a"),
        };
        assert_eq!(err.to_string(), "no forward table for session=s1 src=a");

        let err = ForwardError::NoDestination {
            session_id: SessionId::from("s1"),
            src: Address::from("a"),
            dst: Address::from("b"),
        };
        assert_eq!(err.to_string(), "no destination for session=s1 src=a dst=b");
    }

    #[test]
    fn send_error_display() {
        assert_eq!(SendError::Closed.to_string(), "destination closed");
        assert_eq!(SendError::QueueFull.to_string(), "outbound queue full");
        assert_eq!(
            SendError::Transport("connection reset".to_string()).to_string(),
            "transport error: connection reset"
        );
    }

    #[test]
    fn forward_error_from_send_error() {
        let err: ForwardError = SendError::QueueFull.into();
        assert!(matches!(err, ForwardError::Send(SendError::QueueFull)));
        assert_eq!(err.to_string(), "send failed: outbound queue full");
    }
}
