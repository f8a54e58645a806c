use std::{io, net::SocketAddr};

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, ErrorKind>;

/// Every failure a warpline operation can report.
///
/// The adapter never lets one of these escape as a panic: configuration
/// errors abort the requested start or connect, everything else degrades to
/// "this call failed" and the endpoint stays alive.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// More channels were configured than the library can address.
    #[error("too many channels: limit is {limit}, {count} configured")]
    TooManyChannels {
        /// Configured channel count.
        count: usize,
        /// Maximum supported channel count.
        limit: usize,
    },
    /// The configured port does not fit in 0..=65535.
    #[error("port {0} is outside 0..=65535")]
    InvalidPort(u32),
    /// A bind or connect address could not be turned into a socket address.
    #[error("could not resolve address {address}")]
    AddressResolution {
        /// The address as configured.
        address: String,
    },
    /// The packet library refused to initialize.
    #[error("packet library failed to initialize")]
    LibraryInitFailed,
    /// A host was requested before the packet library was initialized.
    #[error("packet library is not initialized")]
    LibraryNotInitialized,
    /// The address is already bound by another host.
    #[error("address {0} is already in use")]
    AddressInUse(SocketAddr),
    /// Every peer slot of the host is taken.
    #[error("no peer slot available (limit {0})")]
    NoAvailablePeers(usize),
    /// The role is already running.
    #[error("endpoint already started")]
    AlreadyStarted,
    /// The role has no live host.
    #[error("endpoint not started")]
    NotStarted,
    /// The configuration cannot change while a session is running.
    #[error("configuration is locked while a session is active")]
    SessionActive,
    /// The connection id is not registered.
    #[error("unknown connection {0}")]
    UnknownConnection(u32),
    /// The channel index is not configured.
    #[error("channel {channel} out of range ({count} channels configured)")]
    ChannelOutOfRange {
        /// Requested channel index.
        channel: usize,
        /// Number of configured channels.
        count: usize,
    },
    /// The peer handle does not refer to a connected peer.
    #[error("peer is not connected")]
    PeerNotConnected,
    /// A payload is larger than the receiving buffer or the host's packet limit.
    #[error("packet of {len} bytes exceeds the {capacity} byte limit")]
    PacketTooLarge {
        /// Payload length.
        len: usize,
        /// Limit it was checked against.
        capacity: usize,
    },
    /// Client teardown was requested while the server role shares the process.
    #[error("client disconnect refused while the server role is active")]
    CoHostedDisconnect,
    /// Wrapper around a std::io::Error.
    #[error("io error: {0}")]
    IOError(#[from] io::Error),
}
