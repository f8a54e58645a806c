//! Event types surfaced by a packet host.
//!
//! A host reports everything that happened on the wire as a `HostEvent`:
//! peers arriving, leaving or going silent, and payloads arriving on a
//! channel. Receive events own the library's packet; dropping the event
//! releases it.

/// Events a host hands out from `check_events` and `service`.
#[derive(Debug, PartialEq)]
pub enum HostEvent<P, K> {
    /// A connection with `peer` completed its handshake.
    Connect {
        /// The peer that connected.
        peer: P,
    },
    /// `peer` disconnected, either remotely or through a local immediate disconnect.
    Disconnect {
        /// The peer that left.
        peer: P,
    },
    /// `peer` stopped answering for longer than its timeout.
    Timeout {
        /// The peer that went silent.
        peer: P,
    },
    /// A payload arrived from `peer` on `channel`.
    Receive {
        /// The sending peer.
        peer: P,
        /// Channel the payload was sent on.
        channel: u8,
        /// The library-owned packet.
        packet: K,
    },
}

impl<P: Copy, K> HostEvent<P, K> {
    /// Returns the peer the event concerns.
    pub fn peer(&self) -> P {
        match self {
            HostEvent::Connect { peer }
            | HostEvent::Disconnect { peer }
            | HostEvent::Timeout { peer }
            | HostEvent::Receive { peer, .. } => *peer,
        }
    }
}
