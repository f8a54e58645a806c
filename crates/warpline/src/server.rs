use std::net::SocketAddr;

use tracing::{debug, info, trace, warn};
use warpline_core::{
    channel::ChannelPolicy,
    config::Config,
    constants::THROTTLE_SCALE,
    error::{ErrorKind, Result},
    packet_cache::PacketCache,
};
use warpline_host::{HostEvent, HostSettings, PacketHost, PacketLibrary, TimeoutSettings};

use crate::{
    address,
    handler::TransportHandler,
    pump,
    registry::{ConnectionId, ConnectionRegistry},
    state::EndpointState,
};

/// Converts a configured custom timeout into the library's per-peer settings.
pub(crate) fn peer_timeout(config: &Config) -> Option<TimeoutSettings> {
    config.custom_timeout.map(|timeout| TimeoutSettings {
        limit: THROTTLE_SCALE,
        minimum_ms: timeout.minimum_ms(),
        maximum_ms: timeout.maximum_ms(),
    })
}

/// The listening side: one host, many peers, each known by a [`ConnectionId`].
#[derive(Debug)]
pub struct ServerEndpoint<H: PacketHost> {
    host: Option<H>,
    registry: ConnectionRegistry<H::Peer>,
    policy: ChannelPolicy,
    timeout: Option<TimeoutSettings>,
    state: EndpointState,
}

impl<H: PacketHost> ServerEndpoint<H> {
    /// Creates a server that has never been started.
    pub fn new() -> Self {
        Self {
            host: None,
            registry: ConnectionRegistry::new(),
            policy: ChannelPolicy::default(),
            timeout: None,
            state: EndpointState::Uninitialized,
        }
    }

    /// Validates `config`, binds a listening host and starts a fresh session.
    ///
    /// Configuration and bind errors leave the endpoint untouched. Returns the
    /// bound address.
    pub fn start<L>(
        &mut self,
        library: &mut L,
        config: &Config,
        max_packet_size: usize,
    ) -> Result<SocketAddr>
    where
        L: PacketLibrary<Host = H>,
    {
        if self.is_started() {
            return Err(ErrorKind::AlreadyStarted);
        }

        let policy = config.validate()?;
        let bind = address::bind_address(config, config.port()?)?;
        let settings =
            HostSettings::server(bind, config.peer_limit(), policy.len(), max_packet_size);
        let host = library.create_host(&settings)?;
        let local = host.local_addr()?;

        self.registry.clear();
        self.policy = policy;
        self.timeout = peer_timeout(config);
        self.host = Some(host);
        self.state = EndpointState::Started;
        info!(
            "Server listening on {} ({} channels, {} peer slots)",
            local,
            self.policy.len(),
            settings.peer_limit
        );
        Ok(local)
    }

    /// Disposes the host and forgets every connection. Returns false if the
    /// server was not running.
    pub fn stop(&mut self) -> bool {
        self.registry.clear();
        let was_running = self.host.take().is_some();
        if was_running {
            self.state = EndpointState::Stopped;
            info!("Server stopped");
        }
        was_running
    }

    /// Sends `payload` to `id` on `channel`.
    pub fn send(&mut self, id: ConnectionId, channel: usize, payload: &[u8]) -> Result<()> {
        let host = self.host.as_mut().ok_or(ErrorKind::NotStarted)?;
        let peer = self.registry.resolve_id(id).ok_or(ErrorKind::UnknownConnection(id.get()))?;
        let mode = self.policy.resolve(channel)?;
        let channel_id = u8::try_from(channel)
            .map_err(|_| ErrorKind::ChannelOutOfRange { channel, count: self.policy.len() })?;

        trace!(
            "Server sending {} bytes to connection {} on channel {}",
            payload.len(),
            id,
            channel
        );
        host.send(peer, channel_id, mode, payload)
    }

    /// Disconnects `id` immediately. The mapping is removed once the
    /// resulting disconnect event is drained.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<()> {
        let host = self.host.as_mut().ok_or(ErrorKind::NotStarted)?;
        let peer = self.registry.resolve_id(id).ok_or(ErrorKind::UnknownConnection(id.get()))?;
        debug!("Disconnecting connection {} ({:?})", id, peer);
        host.disconnect_now(peer);
        Ok(())
    }

    /// Returns the remote address of `id`.
    pub fn client_address(&self, id: ConnectionId) -> Option<SocketAddr> {
        let host = self.host.as_ref()?;
        let peer = self.registry.resolve_id(id)?;
        host.peer_address(peer)
    }

    /// Drains pending host events into registry updates and `handler` calls.
    pub fn pump<T: TransportHandler>(&mut self, cache: &mut PacketCache, handler: &mut T) -> usize {
        let Some(host) = self.host.as_mut() else { return 0 };
        let registry = &mut self.registry;
        let timeout = self.timeout;

        pump::drain(host, |host, event| match event {
            HostEvent::Connect { peer } => {
                if let Some(timeout) = timeout {
                    host.set_timeout(peer, timeout);
                }
                match registry.register(peer) {
                    Some(id) => {
                        info!("New connection {} from {:?}", id, host.peer_address(peer));
                        handler.on_server_connected(id);
                    }
                    None => warn!("Connect event for already mapped peer {:?}", peer),
                }
            }
            HostEvent::Disconnect { peer } | HostEvent::Timeout { peer } => {
                match registry.unregister(&peer) {
                    Some(id) => {
                        info!("Connection {} closed", id);
                        handler.on_server_disconnected(id);
                    }
                    None => trace!("Ignoring disconnect of unmapped peer {:?}", peer),
                }
            }
            HostEvent::Receive { peer, channel, packet } => {
                let Some(id) = registry.resolve_peer(&peer) else {
                    warn!(
                        "Dropping {} bytes from unmapped peer {:?}, possible attack",
                        packet.as_ref().len(),
                        peer
                    );
                    return;
                };

                let accepted = cache.accept(packet.as_ref());
                drop(packet);
                match accepted {
                    Ok(data) => {
                        trace!(
                            "Connection {} sent {} bytes on channel {}",
                            id,
                            data.len(),
                            channel
                        );
                        handler.on_server_data_received(id, data);
                    }
                    Err(e) => warn!("Dropping packet from connection {}: {}", id, e),
                }
            }
        })
    }

    /// Returns true while the server owns a live host.
    pub fn is_started(&self) -> bool {
        self.host.is_some()
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Returns the connection registry.
    pub fn registry(&self) -> &ConnectionRegistry<H::Peer> {
        &self.registry
    }

    /// Returns the normalized channel list of the running session.
    pub fn channels(&self) -> &ChannelPolicy {
        &self.policy
    }

    /// Returns the host, if started.
    pub fn host(&self) -> Option<&H> {
        self.host.as_ref()
    }

    /// Returns the host mutably, if started.
    pub fn host_mut(&mut self) -> Option<&mut H> {
        self.host.as_mut()
    }
}

impl<H: PacketHost> Default for ServerEndpoint<H> {
    fn default() -> Self {
        Self::new()
    }
}
