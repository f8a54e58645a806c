use std::{net::SocketAddr, time::Duration};

use tracing::{debug, info, trace, warn};
use warpline_core::{
    channel::ChannelPolicy,
    config::Config,
    error::{ErrorKind, Result},
    packet_cache::PacketCache,
};
use warpline_host::{HostEvent, HostSettings, PacketHost, PacketLibrary, PeerState};

use crate::{address, handler::TransportHandler, pump, server::peer_timeout, state::EndpointState};

/// The connecting side: one outbound host with a single peer.
#[derive(Debug)]
pub struct ClientEndpoint<H: PacketHost> {
    host: Option<H>,
    peer: Option<H::Peer>,
    policy: ChannelPolicy,
    state: EndpointState,
}

impl<H: PacketHost> ClientEndpoint<H> {
    /// Creates a client that has never connected.
    pub fn new() -> Self {
        Self {
            host: None,
            peer: None,
            policy: ChannelPolicy::default(),
            state: EndpointState::Uninitialized,
        }
    }

    /// Validates `config`, creates the outbound host if needed and starts
    /// connecting to `host_name` on the configured port.
    ///
    /// A host whose previous connection was lost is reused. Returns the
    /// resolved target address. The connection completes when a connect
    /// event is pumped.
    pub fn connect<L>(
        &mut self,
        library: &mut L,
        config: &Config,
        host_name: &str,
        max_packet_size: usize,
    ) -> Result<SocketAddr>
    where
        L: PacketLibrary<Host = H>,
    {
        if self.peer_state().is_active() {
            return Err(ErrorKind::AlreadyStarted);
        }

        let policy = config.validate()?;
        let target = address::target_address(host_name, config.port()?)?;

        let mut host = match self.host.take() {
            Some(host) => host,
            None => library.create_host(&HostSettings::client(policy.len(), max_packet_size))?,
        };
        let peer = match host.connect(target, policy.len()) {
            Ok(peer) => peer,
            Err(e) => {
                // A reused host stays; a fresh one is dropped
                if self.state == EndpointState::Started {
                    self.host = Some(host);
                }
                return Err(e);
            }
        };
        if let Some(timeout) = peer_timeout(config) {
            host.set_timeout(peer, timeout);
        }

        self.host = Some(host);
        self.peer = Some(peer);
        self.policy = policy;
        self.state = EndpointState::Started;
        info!("Client connecting to {} ({} channels)", target, self.policy.len());
        Ok(target)
    }

    /// Returns true once the handshake completed and the peer is still up.
    pub fn is_connected(&self) -> bool {
        self.peer_state() == PeerState::Connected
    }

    /// Returns the library's state of the server peer.
    pub fn peer_state(&self) -> PeerState {
        match (self.host.as_ref(), self.peer) {
            (Some(host), Some(peer)) => host.peer_state(peer),
            _ => PeerState::Uninitialized,
        }
    }

    /// Flushes pending sends, drops the peer immediately and disposes the
    /// host. Returns false if there was nothing to tear down.
    pub fn disconnect(&mut self) -> bool {
        let Some(mut host) = self.host.take() else {
            self.peer = None;
            return false;
        };

        host.flush();
        if let Some(peer) = self.peer.take() {
            host.disconnect_now(peer);
        }
        drop(host);

        self.state = EndpointState::Stopped;
        info!("Client disconnected");
        true
    }

    /// Sends `payload` to the server on `channel`.
    pub fn send(&mut self, channel: usize, payload: &[u8]) -> Result<()> {
        let host = self.host.as_mut().ok_or(ErrorKind::NotStarted)?;
        let peer = self.peer.ok_or(ErrorKind::NotStarted)?;
        let mode = self.policy.resolve(channel)?;
        let channel_id = u8::try_from(channel)
            .map_err(|_| ErrorKind::ChannelOutOfRange { channel, count: self.policy.len() })?;

        trace!("Client sending {} bytes on channel {}", payload.len(), channel);
        host.send(peer, channel_id, mode, payload)
    }

    /// Returns the live round-trip time to the server.
    pub fn round_trip_time(&self) -> Option<Duration> {
        match (self.host.as_ref(), self.peer) {
            (Some(host), Some(peer)) => host.round_trip_time(peer),
            _ => None,
        }
    }

    /// Drains pending host events into `handler` calls.
    pub fn pump<T: TransportHandler>(&mut self, cache: &mut PacketCache, handler: &mut T) -> usize {
        let Some(host) = self.host.as_mut() else { return 0 };

        pump::drain(host, |_, event| match event {
            HostEvent::Connect { peer } => {
                debug!("Client connected through peer {:?}", peer);
                handler.on_client_connected();
            }
            HostEvent::Disconnect { peer } | HostEvent::Timeout { peer } => {
                debug!("Client lost peer {:?}", peer);
                handler.on_client_disconnected();
            }
            HostEvent::Receive { channel, packet, .. } => {
                let accepted = cache.accept(packet.as_ref());
                drop(packet);
                match accepted {
                    Ok(data) => {
                        trace!("Client received {} bytes on channel {}", data.len(), channel);
                        handler.on_client_data_received(data);
                    }
                    Err(e) => warn!("Dropping packet from server: {}", e),
                }
            }
        })
    }

    /// Returns true while the client owns a live host.
    pub fn is_started(&self) -> bool {
        self.host.is_some()
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Returns the normalized channel list of the running session.
    pub fn channels(&self) -> &ChannelPolicy {
        &self.policy
    }

    /// Returns the host, if started.
    pub fn host(&self) -> Option<&H> {
        self.host.as_ref()
    }
}

impl<H: PacketHost> Default for ClientEndpoint<H> {
    fn default() -> Self {
        Self::new()
    }
}
