#![warn(missing_docs)]

//! warpline-host: the packet-library seam and an in-process loopback library.

/// Events reported by a host (`HostEvent`).
pub mod event;
/// Packet library and host traits.
pub mod host;
/// In-process loopback packet library.
pub mod loopback;
/// Peer connection states.
pub mod peer_state;
/// Time utilities for the host.
pub mod time;

pub use event::HostEvent;
pub use host::{HostSettings, PacketHost, PacketLibrary, TimeoutSettings};
pub use loopback::{LoopbackHost, LoopbackLibrary, LoopbackNetwork, LoopbackPacket, PeerId};
pub use peer_state::PeerState;
pub use time::{Clock, ManualClock, SystemClock};
