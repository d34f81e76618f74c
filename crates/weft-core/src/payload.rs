//! Opaque payload and acknowledgement values carried through the engine.
//!
//! The engine never parses bodies; it only needs the session id (to pick
//! a forward table) and a little diagnostic context for logging.

use std::fmt;

use crate::types::SessionId;

/// A unit of user traffic moving through the fabric.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    session_id: SessionId,
    sequence: i32,
    body: Vec<u8>,
}

impl Payload {
    pub fn new(session_id: SessionId, sequence: i32, body: Vec<u8>) -> Self {
        Self {
            session_id,
            sequence,
            body,
        }
    }

    /// The circuit this payload belongs to, readable without parsing the body.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    #[must_use]
    pub fn sequence(&self) -> i32 {
        self.sequence
    }

    /// The opaque body. The engine never inspects it.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Diagnostic context for log lines tied to this payload.
    #[must_use]
    pub fn logger_fields(&self) -> LoggerFields<'_> {
        LoggerFields(self)
    }
}

/// Display adapter rendering a payload's diagnostic fields as
/// `s/<session>#<sequence>`.
pub struct LoggerFields<'a>(&'a Payload);

impl fmt::Display for LoggerFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s/{}#{}", self.0.session_id, self.0.sequence)
    }
}

/// An end-to-end acknowledgement travelling the reverse leg of a circuit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Acknowledgement {
    session_id: SessionId,
    body: Vec<u8>,
}

impl Acknowledgement {
    pub fn new(session_id: SessionId, body: Vec<u8>) -> Self {
        Self { session_id, body }
    }

    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
