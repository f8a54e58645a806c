#![warn(missing_docs)]

//! warpline-core: foundational types shared by every warpline layer.
//!
//! This crate provides the pieces both the packet-library interface and the
//! adapter agree on:
//! - Configuration types
//! - Error handling
//! - Transport constants
//! - Channel policy (delivery modes per channel index)
//! - The receive packet cache

/// Transport constants shared across layers.
pub mod constants {
    /// Port the server listens on and the client dials when nothing else is configured.
    pub const DEFAULT_PORT: u16 = 7777;
    /// Default packet cache size in kilobytes.
    pub const DEFAULT_MAX_PACKET_SIZE_KB: usize = 64;
    /// Hard upper bound on configured channels; the library addresses channels with a byte.
    pub const MAX_CHANNELS: usize = 255;
    /// Peer slots a host gets when no custom peer limit is configured.
    pub const DEFAULT_MAX_PEERS: usize = 4095;
    /// Packet throttle scale handed to the library along with custom timeouts.
    pub const THROTTLE_SCALE: u32 = 32;
    /// Default base for custom peer timeouts, in milliseconds.
    pub const DEFAULT_TIMEOUT_BASE_MS: u32 = 5000;
    /// Default multiplier applied to the timeout base to get the hard timeout.
    pub const DEFAULT_TIMEOUT_MULTIPLIER: u32 = 3;
    /// Ticks between two round-trip-time samples (two seconds at 60 ticks per second).
    pub const DEFAULT_PING_SAMPLE_INTERVAL: u32 = 120;
    /// Address reported for connection ids the server does not know.
    pub const UNKNOWN_ADDRESS: &str = "UNKNOWN";
}

/// Channel policy: delivery modes per channel index.
pub mod channel;
/// Configuration options for endpoints and the adapter.
pub mod config;
/// Error types and results.
pub mod error;
/// The single reusable receive buffer.
pub mod packet_cache;

pub use channel::{ChannelPolicy, DeliveryFlags, DeliveryGuarantee, DeliveryMode, OrderingGuarantee};
pub use config::{Config, TimeoutConfig};
pub use error::{ErrorKind, Result};
pub use packet_cache::PacketCache;
