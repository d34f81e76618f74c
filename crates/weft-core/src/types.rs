//! Newtype wrappers for the opaque string tokens used on the data path.
//!
//! Addresses and session ids are assigned upstream; the engine only
//! compares, hashes, and logs them. Both are backed by `Arc<str>` so
//! hot-path clones are refcount bumps rather than allocations.

use std::fmt;
use std::sync::Arc;

/// An opaque token naming a deliverable endpoint on this router: an
/// xgress endpoint or a peer link's identity token.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Arc<str>);

impl Address {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(token: &str) -> Self {
        Self(Arc::from(token))
    }
}

impl From<String> for Address {
    fn from(token: String) -> Self {
        Self(Arc::from(token))
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

/// An opaque token identifying an end-to-end circuit. Globally unique,
/// assigned upstream of this router.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Arc<str>);

impl SessionId {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(token: &str) -> Self {
        Self(Arc::from(token))
    }
}

impl From<String> for SessionId {
    fn from(token: String) -> Self {
        Self(Arc::from(token))
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}
