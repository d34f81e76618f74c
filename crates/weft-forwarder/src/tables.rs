//! Forwarding tables: per-session forward tables, the session registry,
//! and the address → destination registry.
//!
//! All three are sharded concurrent maps. Readers on the data path take
//! shard read locks only; control-plane writers touch single shards. The
//! destination registry and its session index are deliberately not
//! updated atomically with respect to each other: registration adds the
//! destination first and links it second, so a concurrent reader sees at
//! worst a destination that is not yet torn down.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use dashmap::DashMap;

use weft_core::{Address, Destination, SessionId};

/// One leg of a routed session: source address → destination address.
///
/// Owned by its [`SessionTable`] entry; created empty on the first route
/// for a session and discarded on unroute. Readers see either the old or
/// the new mapping at a writer's in-flight point, never a torn one.
pub struct ForwardTable {
    forwards: DashMap<Address, Address>,
}

impl ForwardTable {
    pub fn new() -> Self {
        Self {
            forwards: DashMap::new(),
        }
    }

    /// Install a forward. Last writer wins on a source-address collision.
    pub fn set_forward_address(&self, src: Address, dst: Address) {
        self.forwards.insert(src, dst);
    }

    #[must_use]
    pub fn get_forward_address(&self, src: &Address) -> Option<Address> {
        self.forwards.get(src).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.forwards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forwards.is_empty()
    }

    fn debug_dump(&self, out: &mut String) {
        for entry in self.forwards.iter() {
            let _ = writeln!(out, "    {} -> {}", entry.key(), entry.value());
        }
    }
}

impl Default for ForwardTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Session registry: session id → forward table.
pub struct SessionTable {
    sessions: DashMap<SessionId, Arc<ForwardTable>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Fetch the session's forward table, inserting an empty one if the
    /// session is new. Atomic; used only by route installation.
    pub fn get_or_create_forward_table(&self, session_id: SessionId) -> Arc<ForwardTable> {
        self.sessions
            .entry(session_id)
            .or_insert_with(|| Arc::new(ForwardTable::new()))
            .value()
            .clone()
    }

    /// Hot-path lookup.
    #[must_use]
    pub fn get_forward_table(&self, session_id: &SessionId) -> Option<Arc<ForwardTable>> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
    }

    pub fn remove_forward_table(&self, session_id: &SessionId) -> Option<Arc<ForwardTable>> {
        self.sessions.remove(session_id).map(|(_, table)| table)
    }

    /// Snapshot of the session ids present at the time of the call.
    /// Sessions added while the snapshot is taken are picked up by the
    /// caller's next sweep.
    #[must_use]
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Human-readable dump of every session and its forwards.
    #[must_use]
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "sessions ({}):", self.sessions.len());
        for entry in self.sessions.iter() {
            let _ = writeln!(
                out,
                "  s/{} ({} forwards)",
                entry.key(),
                entry.value().len()
            );
            entry.value().debug_dump(&mut out);
        }
        out
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Destination registry: address → destination, plus a session → address
/// index so a session's endpoints can be torn down together.
///
/// The two maps are deliberately decoupled: link destinations live only
/// in the address map, keyed by their identity token, and are never
/// linked to a session.
pub struct AddressMap {
    destinations: DashMap<Address, Destination>,
    by_session: DashMap<SessionId, HashSet<Address>>,
}

impl AddressMap {
    pub fn new() -> Self {
        Self {
            destinations: DashMap::new(),
            by_session: DashMap::new(),
        }
    }

    /// Register a destination. Last writer wins on an address collision.
    pub fn add_destination(&self, address: Address, destination: Destination) {
        self.destinations.insert(address, destination);
    }

    /// Add an address to the session's endpoint set.
    pub fn link_session(&self, session_id: SessionId, address: Address) {
        self.by_session.entry(session_id).or_default().insert(address);
    }

    #[must_use]
    pub fn get_destination(&self, address: &Address) -> Option<Destination> {
        self.destinations
            .get(address)
            .map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn has_destination(&self, address: &Address) -> bool {
        self.destinations.contains_key(address)
    }

    /// Snapshot of the addresses linked to a session. Concurrent
    /// mutation of the underlying set does not disturb the returned
    /// vector.
    #[must_use]
    pub fn get_addresses_for_session(&self, session_id: &SessionId) -> Option<Vec<Address>> {
        self.by_session
            .get(session_id)
            .map(|entry| entry.value().iter().cloned().collect())
    }

    /// Remove the destination registered at `address`. Leaves every
    /// session index untouched.
    pub fn remove_destination(&self, address: &Address) -> Option<Destination> {
        self.destinations.remove(address).map(|(_, dest)| dest)
    }

    /// Drop the session's endpoint index. Leaves the address map untouched.
    pub fn unlink_session(&self, session_id: &SessionId) {
        self.by_session.remove(session_id);
    }

    #[must_use]
    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }

    /// Human-readable dump of both mappings.
    #[must_use]
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "destinations ({}):", self.destinations.len());
        for entry in self.destinations.iter() {
            let _ = writeln!(out, "  @/{} -> {:?}", entry.key(), entry.value());
        }
        let _ = writeln!(out, "session links ({}):", self.by_session.len());
        for entry in self.by_session.iter() {
            let mut addresses: Vec<&str> =
                entry.value().iter().map(|addr| addr.as_str()).collect();
            addresses.sort_unstable();
            let _ = writeln!(out, "  s/{} -> {}", entry.key(), addresses.join(", "));
        }
        out
    }
}

impl Default for AddressMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::{Acknowledgement, Payload, SendError, SendHandle, XgressDestination};

    struct NullXgress {
        label: String,
    }

    impl SendHandle for NullXgress {
        fn send_payload(&self, _payload: Payload) -> Result<(), SendError> {
            Ok(())
        }
        fn send_acknowledgement(&self, _ack: Acknowledgement) -> Result<(), SendError> {
            Ok(())
        }
    }

    impl XgressDestination for NullXgress {
        fn unrouted(&self) {}
        fn start(&self) {}
        fn is_terminator(&self) -> bool {
            false
        }
        fn label(&self) -> String {
            self.label.clone()
        }
        fn time_of_last_rx_from_link(&self) -> i64 {
            0
        }
    }

    fn xgress(label: &str) -> Destination {
        Destination::Xgress(Arc::new(NullXgress {
            label: label.to_string(),
        }))
    }

    #[test]
    fn forward_table_last_writer_wins() {
        let table = ForwardTable::new();
        table.set_forward_address(Address::from("a"), Address::from("b"));
        table.set_forward_address(Address::from("a"), Address::from("c"));

        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get_forward_address(&Address::from("a")),
            Some(Address::from("c"))
        );
    }

    #[test]
    fn forward_table_miss_returns_none() {
        let table = ForwardTable::new();
        assert!(table.is_empty());
        assert!(table.get_forward_address(&Address::from("nope")).is_none());
    }

    #[test]
    fn session_table_get_or_create_returns_same_table() {
        let sessions = SessionTable::new();
        let first = sessions.get_or_create_forward_table(SessionId::from("s1"));
        first.set_forward_address(Address::from("a"), Address::from("b"));

        let second = sessions.get_or_create_forward_table(SessionId::from("s1"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn session_table_remove_makes_lookups_miss() {
        let sessions = SessionTable::new();
        sessions.get_or_create_forward_table(SessionId::from("s1"));
        assert!(sessions.get_forward_table(&SessionId::from("s1")).is_some());

        assert!(sessions.remove_forward_table(&SessionId::from("s1")).is_some());
        assert!(sessions.get_forward_table(&SessionId::from("s1")).is_none());
        // Second remove is a no-op.
        assert!(sessions.remove_forward_table(&SessionId::from("s1")).is_none());
    }

    #[test]
    fn session_table_snapshot_lists_sessions() {
        let sessions = SessionTable::new();
        sessions.get_or_create_forward_table(SessionId::from("s1"));
        sessions.get_or_create_forward_table(SessionId::from("s2"));

        let mut ids = sessions.session_ids();
        ids.sort();
        assert_eq!(ids, vec![SessionId::from("s1"), SessionId::from("s2")]);
    }

    #[test]
    fn address_map_add_and_remove_destination() {
        let map = AddressMap::new();
        let addr = Address::from("a");

        map.add_destination(addr.clone(), xgress("one"));
        assert!(map.has_destination(&addr));
        // Overwrite on collision; still one entry.
        map.add_destination(addr.clone(), xgress("two"));
        assert_eq!(map.destination_count(), 1);

        let removed = map.remove_destination(&addr).unwrap();
        assert_eq!(removed.as_xgress().unwrap().label(), "two");
        assert!(!map.has_destination(&addr));
        assert!(map.remove_destination(&addr).is_none());
    }

    #[test]
    fn session_links_are_a_deduplicated_set() {
        let map = AddressMap::new();
        let sid = SessionId::from("s1");

        map.link_session(sid.clone(), Address::from("a"));
        map.link_session(sid.clone(), Address::from("b"));
        map.link_session(sid.clone(), Address::from("a"));

        let mut addrs = map.get_addresses_for_session(&sid).unwrap();
        addrs.sort();
        assert_eq!(addrs, vec![Address::from("a"), Address::from("b")]);
    }

    #[test]
    fn unlink_session_leaves_destinations_in_place() {
        let map = AddressMap::new();
        let sid = SessionId::from("s1");
        let addr = Address::from("a");

        map.add_destination(addr.clone(), xgress("one"));
        map.link_session(sid.clone(), addr.clone());

        map.unlink_session(&sid);
        assert!(map.get_addresses_for_session(&sid).is_none());
        assert!(map.has_destination(&addr));
    }

    #[test]
    fn remove_destination_leaves_session_index_in_place() {
        let map = AddressMap::new();
        let sid = SessionId::from("s1");
        let addr = Address::from("a");

        map.add_destination(addr.clone(), xgress("one"));
        map.link_session(sid.clone(), addr.clone());

        map.remove_destination(&addr);
        assert_eq!(map.get_addresses_for_session(&sid).unwrap(), vec![addr]);
    }

    #[test]
    fn debug_dump_mentions_sessions_and_destinations() {
        let sessions = SessionTable::new();
        sessions
            .get_or_create_forward_table(SessionId::from("s1"))
            .set_forward_address(Address::from("a"), Address::from("b"));

        let dump = sessions.debug_dump();
        assert!(dump.contains("sessions (1):"));
        assert!(dump.contains("a -> b"));

        let map = AddressMap::new();
        map.add_destination(Address::from("a"), xgress("one"));
        map.link_session(SessionId::from("s1"), Address::from("a"));

        let dump = map.debug_dump();
        assert!(dump.contains("destinations (1):"));
        assert!(dump.contains("s/s1 -> a"));
    }
}
