use std::{collections::HashMap, fmt, hash::Hash};

use tracing::debug;

/// Integer identity the framework uses for a remote client.
///
/// Assigned from 1 in strictly increasing order for the lifetime of a server
/// session. Never reused until the server stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u32);

impl ConnectionId {
    /// First id handed out in a server session.
    pub const FIRST: ConnectionId = ConnectionId(1);

    /// Wraps a raw id received from the framework.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ConnectionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Bidirectional mapping between library peer handles and connection ids.
///
/// Both directions are updated by the same call, so every peer resolves to
/// exactly one id and back.
#[derive(Debug)]
pub struct ConnectionRegistry<P> {
    by_peer: HashMap<P, ConnectionId>,
    by_id: HashMap<ConnectionId, P>,
    next_id: u32,
}

impl<P: Copy + Eq + Hash + fmt::Debug> ConnectionRegistry<P> {
    /// Creates an empty registry whose first id is 1.
    pub fn new() -> Self {
        Self { by_peer: HashMap::new(), by_id: HashMap::new(), next_id: ConnectionId::FIRST.0 }
    }

    /// Assigns the next id to `peer`.
    ///
    /// Returns None without touching either map when the peer is already
    /// registered or the id space is exhausted.
    pub fn register(&mut self, peer: P) -> Option<ConnectionId> {
        if self.by_peer.contains_key(&peer) {
            return None;
        }

        let id = ConnectionId(self.next_id);
        self.next_id = self.next_id.checked_add(1)?;
        self.by_peer.insert(peer, id);
        self.by_id.insert(id, peer);
        debug!("Mapped peer {:?} to connection {}", peer, id);
        Some(id)
    }

    /// Returns the id of `peer`.
    pub fn resolve_peer(&self, peer: &P) -> Option<ConnectionId> {
        self.by_peer.get(peer).copied()
    }

    /// Returns the peer behind `id`.
    pub fn resolve_id(&self, id: ConnectionId) -> Option<P> {
        self.by_id.get(&id).copied()
    }

    /// Removes `peer` from both maps. Unknown peers are ignored.
    pub fn unregister(&mut self, peer: &P) -> Option<ConnectionId> {
        let id = self.by_peer.remove(peer)?;
        self.by_id.remove(&id);
        debug!("Unmapped peer {:?} from connection {}", peer, id);
        Some(id)
    }

    /// Forgets every mapping and restarts ids at 1.
    pub fn clear(&mut self) {
        self.by_peer.clear();
        self.by_id.clear();
        self.next_id = ConnectionId::FIRST.0;
    }

    /// Returns the number of registered peers.
    pub fn len(&self) -> usize {
        self.by_peer.len()
    }

    /// Returns true if no peer is registered.
    pub fn is_empty(&self) -> bool {
        self.by_peer.is_empty()
    }

    /// Iterates over every (id, peer) pair in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionId, P)> + '_ {
        self.by_id.iter().map(|(id, peer)| (*id, *peer))
    }

    /// Returns true if both maps are mutual inverses.
    pub fn is_consistent(&self) -> bool {
        self.by_peer.len() == self.by_id.len()
            && self.by_peer.iter().all(|(peer, id)| self.by_id.get(id) == Some(peer))
    }
}

impl<P: Copy + Eq + Hash + fmt::Debug> Default for ConnectionRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
