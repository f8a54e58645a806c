use std::{
    collections::VecDeque,
    fmt,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, trace, warn};
use warpline_core::{
    channel::DeliveryMode,
    error::{ErrorKind, Result},
};

use super::network::{Datagram, Frame, LoopbackNetwork};
use crate::{
    event::HostEvent,
    host::{HostSettings, PacketHost, TimeoutSettings},
    peer_state::PeerState,
    time::Clock,
};

/// Interval between keep-alive pings on an idle connection.
pub const PING_INTERVAL: Duration = Duration::from_millis(500);

/// Index of a peer slot in a [`LoopbackHost`]. Slots are recycled once a
/// peer has disconnected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u32);

impl PeerId {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the slot index.
    pub fn index(&self) -> u32 {
        self.0
    }

    fn slot(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inbound packet owned by the loopback library.
#[derive(Debug, PartialEq, Eq)]
pub struct LoopbackPacket {
    payload: Box<[u8]>,
    mode: DeliveryMode,
}

impl LoopbackPacket {
    /// Returns the delivery mode the packet was sent with.
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Returns the payload length.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl AsRef<[u8]> for LoopbackPacket {
    fn as_ref(&self) -> &[u8] {
        &self.payload
    }
}

#[derive(Debug)]
struct PeerSlot {
    state: PeerState,
    remote_address: Option<SocketAddr>,
    remote_peer: Option<PeerId>,
    channel_count: usize,
    timeout: TimeoutSettings,
    last_received: Instant,
    last_ping: Instant,
    round_trip_time: Option<Duration>,
}

impl PeerSlot {
    fn occupy(&mut self, state: PeerState, remote: SocketAddr, channel_count: usize, now: Instant) {
        *self = PeerSlot {
            state,
            remote_address: Some(remote),
            remote_peer: None,
            channel_count,
            timeout: TimeoutSettings::default(),
            last_received: now,
            last_ping: now,
            round_trip_time: None,
        };
    }

    fn release(&mut self, state: PeerState) {
        self.state = state;
        self.remote_address = None;
        self.remote_peer = None;
        self.round_trip_time = None;
    }

    fn is_from(&self, from: &SocketAddr) -> bool {
        self.state.is_active()
            && self.remote_address.as_ref().is_some_and(|remote| same_endpoint(remote, from))
    }
}

// A host bound to a wildcard answers from the wildcard address, not from
// the one its peer dialled.
fn same_endpoint(a: &SocketAddr, b: &SocketAddr) -> bool {
    let (x, y) = (a.ip(), b.ip());
    a.port() == b.port()
        && (x == y
            || x.is_unspecified()
            || y.is_unspecified()
            || (x.is_loopback() && y.is_loopback()))
}

/// Loopback implementation of [`PacketHost`].
///
/// The handshake completes in one round trip: the accepting side is
/// connected as soon as it answers, the connecting side once the answer
/// arrives. Outgoing frames are queued until `service` or `flush`.
pub struct LoopbackHost {
    network: LoopbackNetwork,
    address: SocketAddr,
    inbox: Receiver<Datagram>,
    peers: Vec<PeerSlot>,
    events: VecDeque<HostEvent<PeerId, LoopbackPacket>>,
    outgoing: Vec<(SocketAddr, Frame)>,
    settings: HostSettings,
    clock: Arc<dyn Clock>,
}

impl LoopbackHost {
    pub(crate) fn bind(
        network: LoopbackNetwork,
        settings: HostSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let (address, inbox) = network.bind(settings.address)?;
        debug!("Loopback host bound to {} ({} peer slots)", address, settings.peer_limit);

        Ok(Self {
            network,
            address,
            inbox,
            peers: Vec::new(),
            events: VecDeque::new(),
            outgoing: Vec::new(),
            settings,
            clock,
        })
    }

    /// Returns the number of peers currently occupying a slot.
    pub fn active_peers(&self) -> usize {
        self.peers.iter().filter(|slot| slot.state.is_active()).count()
    }

    fn allocate_peer(&mut self, now: Instant) -> Option<PeerId> {
        if let Some(index) = self.peers.iter().position(|slot| !slot.state.is_active()) {
            return Some(PeerId::new(index as u32));
        }
        if self.peers.len() >= self.settings.peer_limit {
            return None;
        }

        self.peers.push(PeerSlot {
            state: PeerState::Uninitialized,
            remote_address: None,
            remote_peer: None,
            channel_count: 0,
            timeout: TimeoutSettings::default(),
            last_received: now,
            last_ping: now,
            round_trip_time: None,
        });
        Some(PeerId::new((self.peers.len() - 1) as u32))
    }

    fn slot(&self, peer: PeerId) -> Option<&PeerSlot> {
        self.peers.get(peer.slot())
    }

    fn slot_from(&mut self, peer: PeerId, from: &SocketAddr) -> Option<&mut PeerSlot> {
        self.peers.get_mut(peer.slot()).filter(|slot| slot.is_from(from))
    }

    fn handle_datagram(&mut self, datagram: Datagram, now: Instant) {
        let Datagram { from, frame } = datagram;
        match frame {
            Frame::Connect { peer: remote, channel_count } => {
                self.accept(from, remote, channel_count, now)
            }
            Frame::Accept { peer, remote, channel_count } => {
                let Some(slot) = self.slot_from(peer, &from) else {
                    trace!("Dropping accept from {} for unknown peer {}", from, peer);
                    return;
                };
                if slot.state != PeerState::Connecting {
                    return;
                }
                slot.state = PeerState::Connected;
                slot.remote_peer = Some(remote);
                slot.channel_count = slot.channel_count.min(channel_count);
                slot.last_received = now;
                self.events.push_back(HostEvent::Connect { peer });
            }
            Frame::Data { peer, channel, mode, payload } => {
                let Some(slot) = self.slot_from(peer, &from) else {
                    trace!("Dropping data from {} for unknown peer {}", from, peer);
                    return;
                };
                if !slot.state.is_established() || channel as usize >= slot.channel_count {
                    trace!("Dropping data from {} on channel {}", from, channel);
                    return;
                }
                slot.last_received = now;
                self.events.push_back(HostEvent::Receive {
                    peer,
                    channel,
                    packet: LoopbackPacket { payload, mode },
                });
            }
            Frame::Ping { peer, sent_at } => {
                let Some(slot) = self.slot_from(peer, &from) else { return };
                slot.last_received = now;
                if let Some(remote) = slot.remote_peer {
                    self.outgoing.push((from, Frame::Pong { peer: remote, sent_at }));
                }
            }
            Frame::Pong { peer, sent_at } => {
                let Some(slot) = self.slot_from(peer, &from) else { return };
                slot.last_received = now;
                slot.round_trip_time = Some(now.saturating_duration_since(sent_at));
            }
            Frame::Disconnect { peer } => {
                let Some(slot) = self.slot_from(peer, &from) else { return };
                let remote = slot.remote_peer;
                // Crossing graceful disconnects count as confirmed
                let state = if slot.state == PeerState::Disconnecting {
                    PeerState::Disconnected
                } else {
                    PeerState::Zombie
                };
                slot.release(state);
                if let Some(remote) = remote {
                    self.outgoing.push((from, Frame::DisconnectAck { peer: remote }));
                }
                debug!("Peer {} ({}) disconnected", peer, from);
                self.events.push_back(HostEvent::Disconnect { peer });
            }
            Frame::DisconnectAck { peer } => {
                let Some(slot) = self.slot_from(peer, &from) else { return };
                if slot.state != PeerState::Disconnecting {
                    return;
                }
                slot.release(PeerState::Disconnected);
                debug!("Peer {} ({}) confirmed disconnect", peer, from);
                self.events.push_back(HostEvent::Disconnect { peer });
            }
        }
    }

    fn accept(&mut self, from: SocketAddr, remote: PeerId, channel_count: usize, now: Instant) {
        let stale = self
            .peers
            .iter()
            .position(|slot| slot.is_from(&from) && slot.remote_peer == Some(remote));
        if let Some(index) = stale {
            // The remote reused its slot, so the old connection is gone
            let peer = PeerId::new(index as u32);
            self.peers[index].release(PeerState::Zombie);
            debug!("Peer {} ({}) replaced by a new connection", peer, from);
            self.events.push_back(HostEvent::Disconnect { peer });
        }

        let Some(peer) = self.allocate_peer(now) else {
            warn!(
                "Refusing connection from {}: all {} peer slots in use",
                from, self.settings.peer_limit
            );
            self.outgoing.push((from, Frame::Disconnect { peer: remote }));
            return;
        };

        let channel_count = channel_count.min(self.settings.channel_limit);
        let slot = &mut self.peers[peer.slot()];
        slot.occupy(PeerState::Connected, from, channel_count, now);
        slot.remote_peer = Some(remote);

        self.outgoing.push((from, Frame::Accept { peer: remote, remote: peer, channel_count }));
        self.events.push_back(HostEvent::Connect { peer });
    }

    fn update_peers(&mut self, now: Instant) {
        for (index, slot) in self.peers.iter_mut().enumerate() {
            if !slot.state.is_active() {
                continue;
            }

            let silence = now.saturating_duration_since(slot.last_received);
            if silence > Duration::from_millis(u64::from(slot.timeout.maximum_ms)) {
                debug!("Peer #{} timed out after {:?}", index, silence);
                slot.release(PeerState::Zombie);
                self.events.push_back(HostEvent::Timeout { peer: PeerId::new(index as u32) });
                continue;
            }

            if slot.state == PeerState::Connected
                && now.saturating_duration_since(slot.last_ping) >= PING_INTERVAL
            {
                if let (Some(address), Some(remote)) = (slot.remote_address, slot.remote_peer) {
                    self.outgoing.push((address, Frame::Ping { peer: remote, sent_at: now }));
                    slot.last_ping = now;
                }
            }
        }
    }
}

impl PacketHost for LoopbackHost {
    type Peer = PeerId;
    type Packet = LoopbackPacket;

    fn check_events(&mut self) -> Option<HostEvent<PeerId, LoopbackPacket>> {
        self.events.pop_front()
    }

    fn service(&mut self) -> Result<Option<HostEvent<PeerId, LoopbackPacket>>> {
        let now = self.clock.now();
        self.flush();

        loop {
            match self.inbox.try_recv() {
                Ok(datagram) => self.handle_datagram(datagram, now),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        self.update_peers(now);
        self.flush();
        Ok(self.events.pop_front())
    }

    fn connect(&mut self, address: SocketAddr, channel_count: usize) -> Result<PeerId> {
        let now = self.clock.now();
        let peer = self
            .allocate_peer(now)
            .ok_or(ErrorKind::NoAvailablePeers(self.settings.peer_limit))?;

        let channel_count = channel_count.min(self.settings.channel_limit);
        self.peers[peer.slot()].occupy(PeerState::Connecting, address, channel_count, now);
        self.outgoing.push((address, Frame::Connect { peer, channel_count }));
        debug!("Connecting to {} as peer {}", address, peer);
        Ok(peer)
    }

    fn send(
        &mut self,
        peer: PeerId,
        channel: u8,
        mode: DeliveryMode,
        payload: &[u8],
    ) -> Result<()> {
        let slot = self.slot(peer).ok_or(ErrorKind::PeerNotConnected)?;
        let (Some(address), Some(remote), true) =
            (slot.remote_address, slot.remote_peer, slot.state.is_established())
        else {
            return Err(ErrorKind::PeerNotConnected);
        };
        if channel as usize >= slot.channel_count {
            return Err(ErrorKind::ChannelOutOfRange {
                channel: channel as usize,
                count: slot.channel_count,
            });
        }
        let limit = self.settings.max_packet_size;
        if limit > 0 && payload.len() > limit {
            return Err(ErrorKind::PacketTooLarge { len: payload.len(), capacity: limit });
        }

        trace!(
            "Queueing {} bytes for {} on channel {} ({:?})",
            payload.len(),
            address,
            channel,
            mode
        );
        self.outgoing.push((
            address,
            Frame::Data { peer: remote, channel, mode, payload: payload.into() },
        ));
        Ok(())
    }

    fn disconnect_now(&mut self, peer: PeerId) {
        let Some(slot) = self.peers.get_mut(peer.slot()) else { return };
        if !slot.state.is_active() {
            return;
        }

        let remote_address = slot.remote_address;
        let remote_peer = slot.remote_peer;
        slot.release(PeerState::Disconnected);

        match (remote_address, remote_peer) {
            (Some(address), Some(remote)) => {
                // Queued traffic for this peer is discarded, the disconnect goes out right away
                self.outgoing
                    .retain(|(to, frame)| !(*to == address && frame.target() == Some(remote)));
                self.network.deliver(self.address, address, Frame::Disconnect { peer: remote });
            }
            (Some(address), None) => {
                // Still connecting: an unsent connect request is withdrawn
                self.outgoing.retain(|(to, frame)| {
                    let pending = matches!(frame, Frame::Connect { peer: p, .. } if *p == peer);
                    !(*to == address && pending)
                });
            }
            _ => {}
        }
        self.events.push_back(HostEvent::Disconnect { peer });
    }

    fn disconnect(&mut self, peer: PeerId) {
        match self.peer_state(peer) {
            PeerState::Connected => {}
            PeerState::Connecting => {
                self.disconnect_now(peer);
                return;
            }
            _ => return,
        }

        let slot = &mut self.peers[peer.slot()];
        slot.state = PeerState::Disconnecting;
        if let (Some(address), Some(remote)) = (slot.remote_address, slot.remote_peer) {
            // Queued behind any pending data for the peer
            self.outgoing.push((address, Frame::Disconnect { peer: remote }));
        }
        debug!("Disconnecting peer {} gracefully", peer);
    }

    fn flush(&mut self) {
        for (to, frame) in std::mem::take(&mut self.outgoing) {
            self.network.deliver(self.address, to, frame);
        }
    }

    fn set_timeout(&mut self, peer: PeerId, timeout: TimeoutSettings) {
        if let Some(slot) = self.peers.get_mut(peer.slot()) {
            slot.timeout = timeout;
        }
    }

    fn peer_state(&self, peer: PeerId) -> PeerState {
        self.slot(peer).map(|slot| slot.state).unwrap_or_default()
    }

    fn peer_address(&self, peer: PeerId) -> Option<SocketAddr> {
        self.slot(peer).filter(|slot| slot.state.is_active()).and_then(|slot| slot.remote_address)
    }

    fn round_trip_time(&self, peer: PeerId) -> Option<Duration> {
        self.slot(peer).and_then(|slot| slot.round_trip_time)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.address)
    }
}

impl Drop for LoopbackHost {
    fn drop(&mut self) {
        self.network.unbind(&self.address);
    }
}

impl fmt::Debug for LoopbackHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackHost")
            .field("address", &self.address)
            .field("peers", &self.peers)
            .field("queued_events", &self.events.len())
            .field("outgoing", &self.outgoing.len())
            .field("settings", &self.settings)
            .finish()
    }
}
