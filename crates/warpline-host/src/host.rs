//! The narrow interface between the adapter and a packet library.
//!
//! A packet library hands out hosts; a host owns a socket, a fixed number of
//! peer slots and a queue of [`HostEvent`]s. Every call is non-blocking:
//! `service` performs one zero-timeout sweep of the socket.

use std::{fmt::Debug, hash::Hash, net::SocketAddr, time::Duration};

use warpline_core::{channel::DeliveryMode, error::Result};

use crate::{event::HostEvent, peer_state::PeerState};

/// Per-peer timeout parameters, in the library's terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutSettings {
    /// Number of unacknowledged round trips tolerated before the minimum applies.
    pub limit: u32,
    /// Silence in milliseconds after which a peer with too many losses times out.
    pub minimum_ms: u32,
    /// Silence in milliseconds after which a peer always times out.
    pub maximum_ms: u32,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self { limit: 32, minimum_ms: 5000, maximum_ms: 30000 }
    }
}

/// Parameters for creating a host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostSettings {
    /// Address to bind. None creates an outbound-only host on an ephemeral port.
    pub address: Option<SocketAddr>,
    /// Number of peer slots.
    pub peer_limit: usize,
    /// Maximum channels per peer.
    pub channel_limit: usize,
    /// Incoming bandwidth in bytes/sec (0 = unlimited).
    pub incoming_bandwidth: u32,
    /// Outgoing bandwidth in bytes/sec (0 = unlimited).
    pub outgoing_bandwidth: u32,
    /// Largest payload the host sends, in bytes (0 = unlimited).
    pub max_packet_size: usize,
}

impl HostSettings {
    /// Settings for a listening host.
    pub fn server(
        address: SocketAddr,
        peer_limit: usize,
        channel_limit: usize,
        max_packet_size: usize,
    ) -> Self {
        Self {
            address: Some(address),
            peer_limit,
            channel_limit,
            max_packet_size,
            ..Self::default()
        }
    }

    /// Settings for an outbound host with a single peer slot.
    pub fn client(channel_limit: usize, max_packet_size: usize) -> Self {
        Self { channel_limit, max_packet_size, ..Self::default() }
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            address: None,
            peer_limit: 1,
            channel_limit: 2,
            incoming_bandwidth: 0,
            outgoing_bandwidth: 0,
            max_packet_size: 0,
        }
    }
}

/// A host created by a packet library.
///
/// Dropping the host disposes it: its socket is closed and its peers are
/// abandoned without notice.
pub trait PacketHost {
    /// Opaque peer handle, valid while the peer is connected.
    type Peer: Copy + Eq + Hash + Debug;
    /// Library-owned inbound packet; dropping it releases the library's copy.
    type Packet: AsRef<[u8]>;

    /// Pops an already queued event without touching the socket.
    fn check_events(&mut self) -> Option<HostEvent<Self::Peer, Self::Packet>>;

    /// Sends queued traffic, reads everything the socket has, updates peer
    /// timers and returns the next event. Never blocks.
    fn service(&mut self) -> Result<Option<HostEvent<Self::Peer, Self::Packet>>>;

    /// Starts connecting to `address` with `channel_count` channels.
    fn connect(&mut self, address: SocketAddr, channel_count: usize) -> Result<Self::Peer>;

    /// Queues `payload` for `peer` on `channel` with the given delivery mode.
    fn send(
        &mut self,
        peer: Self::Peer,
        channel: u8,
        mode: DeliveryMode,
        payload: &[u8],
    ) -> Result<()>;

    /// Drops the connection immediately without flushing queued packets.
    fn disconnect_now(&mut self, peer: Self::Peer);

    /// Starts a graceful disconnect: queued packets go out first and the
    /// disconnect event follows once the remote side confirms. Hosts without
    /// a graceful path disconnect immediately.
    fn disconnect(&mut self, peer: Self::Peer) {
        self.disconnect_now(peer);
    }

    /// Sends all queued traffic.
    fn flush(&mut self);

    /// Overrides the timeout parameters of `peer`.
    fn set_timeout(&mut self, peer: Self::Peer, timeout: TimeoutSettings);

    /// Returns the connection state of `peer`.
    fn peer_state(&self, peer: Self::Peer) -> PeerState;

    /// Returns the remote address of `peer`.
    fn peer_address(&self, peer: Self::Peer) -> Option<SocketAddr>;

    /// Returns the last measured round-trip time of `peer`.
    fn round_trip_time(&self, peer: Self::Peer) -> Option<Duration>;

    /// Returns the address the host is bound to.
    fn local_addr(&self) -> Result<SocketAddr>;
}

/// Process-wide entry point of a packet library.
pub trait PacketLibrary {
    /// Host type created by this library.
    type Host: PacketHost;

    /// Initializes the library. Must succeed before any host is created.
    fn initialize(&mut self) -> Result<()>;

    /// Tears the library down; hosts created earlier are invalid afterwards.
    fn deinitialize(&mut self);

    /// Creates a host.
    fn create_host(&mut self, settings: &HostSettings) -> Result<Self::Host>;
}
