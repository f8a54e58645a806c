use std::default::Default;

use crate::{
    channel::{ChannelPolicy, DeliveryMode},
    constants::{
        DEFAULT_MAX_PACKET_SIZE_KB, DEFAULT_MAX_PEERS, DEFAULT_PING_SAMPLE_INTERVAL, DEFAULT_PORT,
        DEFAULT_TIMEOUT_BASE_MS, DEFAULT_TIMEOUT_MULTIPLIER,
    },
    error::{ErrorKind, Result},
};

/// Custom peer timeout, applied to every peer when enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Minimum timeout in milliseconds.
    pub base_ms: u32,
    /// The hard timeout is `base_ms * multiplier`.
    pub multiplier: u32,
}

impl TimeoutConfig {
    /// Returns the minimum timeout in milliseconds.
    pub fn minimum_ms(&self) -> u32 {
        self.base_ms
    }

    /// Returns the hard timeout in milliseconds.
    pub fn maximum_ms(&self) -> u32 {
        self.base_ms.saturating_mul(self.multiplier)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { base_ms: DEFAULT_TIMEOUT_BASE_MS, multiplier: DEFAULT_TIMEOUT_MULTIPLIER }
    }
}

#[derive(Clone, Debug)]
/// Configuration options for both endpoint roles.
///
/// Validated when a server starts or a client connects; changes made while a
/// session runs are not picked up.
pub struct Config {
    /// Bind the server to every interface instead of `server_bind_address`.
    pub server_bind_all: bool,
    /// IP address or hostname the server binds to when `server_bind_all` is false.
    pub server_bind_address: String,
    /// Use the IPv6 dual-stack wildcard `::` for bind-all servers. Some
    /// workstation environments only answer loopback traffic through it.
    pub force_ipv6_wildcard: bool,
    /// Port the server listens on and the client dials. Must fit in 0..=65535.
    pub port: u32,
    /// Size of the receive packet cache in kilobytes. Inbound packets larger
    /// than the cache are dropped.
    pub max_packet_size_kb: usize,
    /// Delivery mode per channel index. Normalized before use.
    pub channels: Vec<DeliveryMode>,
    /// Peer limit of the server host. None uses the library maximum.
    pub custom_max_peers: Option<usize>,
    /// Timeout applied to every peer. None keeps the library defaults.
    pub custom_timeout: Option<TimeoutConfig>,
    /// Ticks between client round-trip-time samples. None disables sampling.
    pub ping_sample_interval: Option<u32>,
}

impl Config {
    /// Validates the port range.
    pub fn port(&self) -> Result<u16> {
        u16::try_from(self.port).map_err(|_| ErrorKind::InvalidPort(self.port))
    }

    /// Validates the channel count and returns the normalized channel list.
    pub fn channel_policy(&self) -> Result<ChannelPolicy> {
        ChannelPolicy::validate(&self.channels)
    }

    /// Runs every start/connect check: port range first, then channel count.
    pub fn validate(&self) -> Result<ChannelPolicy> {
        self.port()?;
        self.channel_policy()
    }

    /// Returns the packet cache capacity in bytes.
    pub fn max_packet_bytes(&self) -> usize {
        self.max_packet_size_kb.saturating_mul(1024)
    }

    /// Returns the server's peer limit.
    pub fn peer_limit(&self) -> usize {
        self.custom_max_peers.unwrap_or(DEFAULT_MAX_PEERS)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_bind_all: true,
            server_bind_address: "127.0.0.1".to_owned(),
            force_ipv6_wildcard: cfg!(target_os = "macos"),
            port: DEFAULT_PORT as u32,
            max_packet_size_kb: DEFAULT_MAX_PACKET_SIZE_KB,
            channels: vec![DeliveryMode::ReliableOrdered, DeliveryMode::UnreliableUnordered],
            custom_max_peers: None, // Library maximum
            custom_timeout: None,   // Library defaults
            ping_sample_interval: Some(DEFAULT_PING_SAMPLE_INTERVAL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.server_bind_all);
        assert_eq!(config.port().unwrap(), 7777);
        assert_eq!(config.max_packet_bytes(), 64 * 1024);
        assert_eq!(config.peer_limit(), DEFAULT_MAX_PEERS);
        assert_eq!(config.custom_timeout, None);
        assert_eq!(config.ping_sample_interval, Some(120));
        assert_eq!(config.channel_policy().unwrap(), ChannelPolicy::default());
    }

    #[test]
    fn test_port_out_of_range() {
        let mut config = Config::default();
        config.port = 65536;
        match config.port() {
            Err(ErrorKind::InvalidPort(65536)) => (),
            other => panic!("Expected InvalidPort, got {:?}", other),
        }

        config.port = 0;
        assert_eq!(config.port().unwrap(), 0);
        config.port = 65535;
        assert_eq!(config.port().unwrap(), 65535);
    }

    #[test]
    fn test_custom_peer_limit() {
        let mut config = Config::default();
        config.custom_max_peers = Some(8);
        assert_eq!(config.peer_limit(), 8);
    }

    #[test]
    fn test_timeout_bounds() {
        let timeout = TimeoutConfig::default();
        assert_eq!(timeout.minimum_ms(), 5000);
        assert_eq!(timeout.maximum_ms(), 15000);

        let huge = TimeoutConfig { base_ms: u32::MAX, multiplier: 3 };
        assert_eq!(huge.maximum_ms(), u32::MAX);
    }

    #[test]
    fn test_validate_checks_port_before_channels() {
        let mut config = Config::default();
        config.port = 70000;
        config.channels = vec![DeliveryMode::ReliableOrdered; 256];
        match config.validate() {
            Err(ErrorKind::InvalidPort(70000)) => (),
            other => panic!("Expected InvalidPort, got {:?}", other),
        }

        config.port = 7777;
        match config.validate() {
            Err(ErrorKind::TooManyChannels { count: 256, limit: 255 }) => (),
            other => panic!("Expected TooManyChannels, got {:?}", other),
        }

        config.channels = vec![DeliveryMode::UnreliableFragmented];
        assert_eq!(config.validate().unwrap(), ChannelPolicy::default());
    }
}
