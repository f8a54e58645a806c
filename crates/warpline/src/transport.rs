use std::{fmt, net::SocketAddr};

use tracing::{error, info, warn};
use warpline_core::{
    config::Config,
    constants::UNKNOWN_ADDRESS,
    error::{ErrorKind, Result},
    packet_cache::PacketCache,
};
use warpline_host::PacketLibrary;

use crate::{
    client::ClientEndpoint,
    handler::TransportHandler,
    ping::PingSampler,
    registry::ConnectionId,
    server::ServerEndpoint,
    state::{LibraryState, TransportMode},
};

/// Lifecycle controller and framework-facing surface of the adapter.
///
/// Owns the packet library, both endpoint roles, the shared packet cache and
/// the framework's [`TransportHandler`]. Nothing here blocks: the framework
/// calls [`Transport::tick`] once per frame and receives every notification
/// from inside that call.
///
/// Framework calls report failure as `false` (or the `"UNKNOWN"` address)
/// and log the reason; the `try_` variants return the error instead.
pub struct Transport<L: PacketLibrary, T: TransportHandler> {
    config: Config,
    library: L,
    library_state: LibraryState,
    server: ServerEndpoint<L::Host>,
    client: ClientEndpoint<L::Host>,
    cache: PacketCache,
    ping: PingSampler,
    handler: T,
}

impl<L: PacketLibrary, T: TransportHandler> Transport<L, T> {
    /// Creates a transport with the default configuration.
    pub fn new(library: L, handler: T) -> Self {
        Self::with_config(Config::default(), library, handler)
    }

    /// Creates a transport with `config`. The library is initialized lazily
    /// by the first server start or client connect.
    pub fn with_config(config: Config, library: L, handler: T) -> Self {
        Self {
            cache: PacketCache::new(config.max_packet_bytes()),
            ping: PingSampler::new(config.ping_sample_interval),
            config,
            library,
            library_state: LibraryState::NotInitialized,
            server: ServerEndpoint::new(),
            client: ClientEndpoint::new(),
            handler,
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Returns the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the configuration and resizes the packet cache.
    ///
    /// Refused while either role is active; a running session keeps the
    /// settings it was started with.
    pub fn configure(&mut self, config: Config) -> Result<()> {
        if self.server.is_started() || self.client.is_started() {
            return Err(ErrorKind::SessionActive);
        }

        self.cache.ensure_capacity(config.max_packet_bytes());
        self.ping = PingSampler::new(config.ping_sample_interval);
        self.config = config;
        Ok(())
    }

    /// Returns the packet cache capacity in bytes.
    pub fn max_packet_size(&self) -> usize {
        self.cache.capacity()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn ensure_library(&mut self) -> Result<()> {
        if self.library_state == LibraryState::Initialized {
            return Ok(());
        }

        if let Err(e) = self.library.initialize() {
            error!("Packet library initialization failed: {}", e);
            return Err(ErrorKind::LibraryInitFailed);
        }
        self.library_state = LibraryState::Initialized;
        info!("Packet library initialized");
        Ok(())
    }

    /// Starts the server. See [`Transport::server_start`].
    pub fn try_server_start(&mut self) -> Result<SocketAddr> {
        self.ensure_library()?;
        let max_packet_size = self.config.max_packet_bytes();
        let address = self.server.start(&mut self.library, &self.config, max_packet_size)?;

        self.cache.ensure_capacity(max_packet_size);
        self.handler.on_server_startup();
        Ok(address)
    }

    /// Initializes the library if needed and starts listening.
    pub fn server_start(&mut self) -> bool {
        match self.try_server_start() {
            Ok(_) => true,
            Err(e) => {
                error!("Server start failed: {}", e);
                false
            }
        }
    }

    /// Stops the server and forgets every connection. Does nothing if the
    /// server is not running.
    pub fn server_stop(&mut self) -> bool {
        if !self.server.stop() {
            return false;
        }

        self.cache.ensure_capacity(self.config.max_packet_bytes());
        self.handler.on_server_shutdown();
        true
    }

    /// Connects the client. See [`Transport::client_connect`].
    pub fn try_client_connect(&mut self, address: &str) -> Result<SocketAddr> {
        self.ensure_library()?;
        let max_packet_size = self.config.max_packet_bytes();
        let reconnect = self.client.is_started();
        let target =
            self.client.connect(&mut self.library, &self.config, address, max_packet_size)?;

        self.cache.ensure_capacity(max_packet_size);
        self.ping.reset();
        if !reconnect {
            self.handler.on_client_startup();
        }
        Ok(target)
    }

    /// Initializes the library if needed and starts connecting to `address`
    /// on the configured port.
    ///
    /// After the server dropped the client or the connection timed out, this
    /// connects again through the existing host.
    pub fn client_connect(&mut self, address: &str) -> bool {
        match self.try_client_connect(address) {
            Ok(_) => true,
            Err(e) => {
                error!("Client connect to {} failed: {}", address, e);
                false
            }
        }
    }

    /// Disconnects the client. See [`Transport::client_disconnect`].
    pub fn try_client_disconnect(&mut self) -> Result<()> {
        if self.server.is_started() {
            return Err(ErrorKind::CoHostedDisconnect);
        }
        self.teardown_client();
        Ok(())
    }

    /// Flushes and drops the client connection.
    ///
    /// Refused while the server runs in this process: the co-hosted client
    /// goes away with the server.
    pub fn client_disconnect(&mut self) -> bool {
        match self.try_client_disconnect() {
            Ok(()) => true,
            Err(e) => {
                warn!("Client disconnect refused: {}", e);
                false
            }
        }
    }

    fn teardown_client(&mut self) {
        if self.client.disconnect() {
            self.ping.reset();
            self.handler.on_client_shutdown();
        }
    }

    /// Stops both roles and deinitializes the library.
    pub fn shutdown(&mut self) {
        self.server_stop();
        self.teardown_client();

        if self.library_state == LibraryState::Initialized {
            self.library.deinitialize();
            self.library_state = LibraryState::NotInitialized;
            info!("Packet library deinitialized");
        }
    }

    // ========================================================================
    // Data plane
    // ========================================================================

    /// Sends `data` to connection `id` on `channel`.
    pub fn server_send(&mut self, id: ConnectionId, channel: usize, data: &[u8]) -> bool {
        match self.server.send(id, channel, data) {
            Ok(()) => true,
            Err(e) => {
                warn!("Server send to connection {} failed: {}", id, e);
                false
            }
        }
    }

    /// Disconnects connection `id` immediately. The disconnect notification
    /// follows on the next tick.
    pub fn server_disconnect(&mut self, id: ConnectionId) -> bool {
        match self.server.disconnect(id) {
            Ok(()) => true,
            Err(e) => {
                warn!("Server disconnect of connection {} failed: {}", id, e);
                false
            }
        }
    }

    /// Returns `ip:port` of connection `id`, or `"UNKNOWN"`.
    pub fn server_get_client_address(&self, id: ConnectionId) -> String {
        self.server
            .client_address(id)
            .map(|address| address.to_string())
            .unwrap_or_else(|| UNKNOWN_ADDRESS.to_owned())
    }

    /// Sends `data` to the server on `channel`.
    pub fn client_send(&mut self, channel: usize, data: &[u8]) -> bool {
        match self.client.send(channel, data) {
            Ok(()) => true,
            Err(e) => {
                warn!("Client send failed: {}", e);
                false
            }
        }
    }

    // ========================================================================
    // Polling
    // ========================================================================

    /// Runs one frame: samples the client ping, then drains server events,
    /// then client events. Returns the number of events handled.
    pub fn tick(&mut self) -> usize {
        let client = &self.client;
        self.ping.tick(|| client.round_trip_time());

        let mut handled = 0;
        if self.server.is_started() {
            handled += self.server.pump(&mut self.cache, &mut self.handler);
        }
        if self.client.is_started() {
            handled += self.client.pump(&mut self.cache, &mut self.handler);
        }
        handled
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Returns true while the server is listening.
    pub fn server_active(&self) -> bool {
        self.server.is_started()
    }

    /// Returns true while the client has a completed connection.
    pub fn client_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Returns the last sampled client round-trip time in milliseconds.
    pub fn client_ping(&self) -> u32 {
        self.ping.current_ms()
    }

    /// Returns which roles are active.
    pub fn mode(&self) -> TransportMode {
        TransportMode::from_roles(self.server.is_started(), self.client.is_started())
    }

    /// Returns the library state.
    pub fn library_state(&self) -> LibraryState {
        self.library_state
    }

    /// Returns the server endpoint.
    pub fn server(&self) -> &ServerEndpoint<L::Host> {
        &self.server
    }

    /// Returns the client endpoint.
    pub fn client(&self) -> &ClientEndpoint<L::Host> {
        &self.client
    }

    /// Returns the packet library.
    pub fn library(&self) -> &L {
        &self.library
    }

    /// Returns the framework handler.
    pub fn handler(&self) -> &T {
        &self.handler
    }

    /// Returns the framework handler mutably.
    pub fn handler_mut(&mut self) -> &mut T {
        &mut self.handler
    }
}

impl<L: PacketLibrary, T: TransportHandler> Drop for Transport<L, T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<L: PacketLibrary, T: TransportHandler> fmt::Display for Transport<L, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warpline {} in {}", env!("CARGO_PKG_VERSION"), self.mode())
    }
}

impl<L, T> fmt::Debug for Transport<L, T>
where
    L: PacketLibrary + fmt::Debug,
    T: TransportHandler,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("mode", &self.mode())
            .field("library", &self.library)
            .field("library_state", &self.library_state)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}
