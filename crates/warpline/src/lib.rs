#![warn(missing_docs)]

//! Warpline: a poll-driven transport adapter over a reliable-UDP packet library.
//!
//! The adapter maps the library's peer handles to small integer
//! [`ConnectionId`]s, drains every pending library event once per tick
//! without blocking, copies inbound payloads into one shared
//! [`PacketCache`] and enforces per-channel delivery modes on send.
//!
//! - Lifecycle and data plane (`Transport`)
//! - Framework callbacks (`TransportHandler`, `CollectingHandler`)
//! - Core configuration (`Config`, `DeliveryMode`)
//! - The in-process loopback library (`LoopbackLibrary`)
//!
//! Example
//! ```
//! use warpline::prelude::*;
//!
//! let mut transport = Transport::new(LoopbackLibrary::new(), CollectingHandler::new());
//! assert!(transport.server_start());
//! assert!(transport.client_connect("127.0.0.1"));
//!
//! transport.tick();
//! transport.tick();
//! assert!(transport.client_connected());
//! assert!(transport.client_send(0, b"hello"));
//!
//! // The client flushes on its tick, the server reads on the next one
//! transport.tick();
//! transport.tick();
//! let received = transport.handler_mut().drain();
//! assert!(received.contains(&TransportEvent::ServerData(ConnectionId::FIRST, b"hello".to_vec())));
//! ```

/// Bind and target address resolution.
pub mod address;
/// The connecting endpoint.
pub mod client;
/// Framework callbacks.
pub mod handler;
/// Client round-trip-time sampling.
pub mod ping;
/// The non-blocking event drain.
pub mod pump;
/// Peer handle to connection id mapping.
pub mod registry;
/// The listening endpoint.
pub mod server;
/// Endpoint, library and transport states.
pub mod state;
/// The lifecycle controller.
pub mod transport;

pub use client::ClientEndpoint;
pub use handler::{CollectingHandler, TransportEvent, TransportHandler};
pub use ping::PingSampler;
pub use registry::{ConnectionId, ConnectionRegistry};
pub use server::ServerEndpoint;
pub use state::{EndpointState, LibraryState, TransportMode};
pub use transport::Transport;
// Core config, channels and errors
pub use warpline_core::{
    ChannelPolicy, Config, DeliveryMode, ErrorKind, PacketCache, Result, TimeoutConfig,
};
// Library interface and the loopback library
pub use warpline_host::{
    HostEvent, HostSettings, LoopbackLibrary, LoopbackNetwork, PacketHost, PacketLibrary,
    PeerState, TimeoutSettings,
};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        CollectingHandler, Config, ConnectionId, DeliveryMode, LoopbackLibrary, Transport,
        TransportEvent, TransportHandler, TransportMode,
    };
}
