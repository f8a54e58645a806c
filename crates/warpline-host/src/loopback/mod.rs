//! In-process packet library.
//!
//! Hosts created by a [`LoopbackLibrary`] exchange frames over a shared
//! [`LoopbackNetwork`] instead of real sockets. The handshake, per-peer
//! timeouts, keep-alive pings and immediate disconnects behave the way a
//! datagram library's do, which makes the adapter testable end to end
//! without touching the operating system's network stack.

mod host;
mod library;
mod network;

pub use host::{LoopbackHost, LoopbackPacket, PeerId, PING_INTERVAL};
pub use library::LoopbackLibrary;
pub use network::LoopbackNetwork;
