use std::{
    collections::HashMap,
    fmt,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::trace;
use warpline_core::{
    channel::DeliveryMode,
    error::{ErrorKind, Result},
};

use super::host::PeerId;

const EPHEMERAL_PORT_START: u16 = 49152;

/// Frames exchanged between loopback hosts. All but `Connect` are addressed
/// to a peer slot of the receiving host.
#[derive(Debug)]
pub(crate) enum Frame {
    Connect { peer: PeerId, channel_count: usize },
    Accept { peer: PeerId, remote: PeerId, channel_count: usize },
    Data { peer: PeerId, channel: u8, mode: DeliveryMode, payload: Box<[u8]> },
    Ping { peer: PeerId, sent_at: Instant },
    Pong { peer: PeerId, sent_at: Instant },
    Disconnect { peer: PeerId },
    DisconnectAck { peer: PeerId },
}

impl Frame {
    /// Returns the receiving peer slot, if the frame addresses one.
    pub(crate) fn target(&self) -> Option<PeerId> {
        match self {
            Frame::Connect { .. } => None,
            Frame::Accept { peer, .. }
            | Frame::Data { peer, .. }
            | Frame::Ping { peer, .. }
            | Frame::Pong { peer, .. }
            | Frame::Disconnect { peer }
            | Frame::DisconnectAck { peer } => Some(*peer),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Datagram {
    pub(crate) from: SocketAddr,
    pub(crate) frame: Frame,
}

#[derive(Debug)]
struct Directory {
    hosts: HashMap<SocketAddr, Sender<Datagram>>,
    next_ephemeral: u16,
}

impl Directory {
    fn port_taken(&self, address: &SocketAddr) -> bool {
        self.hosts.keys().any(|bound| {
            bound.port() == address.port()
                && (bound.ip() == address.ip()
                    || bound.ip().is_unspecified()
                    || address.ip().is_unspecified())
        })
    }

    fn ephemeral(&mut self, ip: IpAddr) -> Option<SocketAddr> {
        let span = u16::MAX - EPHEMERAL_PORT_START + 1;
        for _ in 0..span {
            let candidate = SocketAddr::new(ip, self.next_ephemeral);
            self.next_ephemeral = match self.next_ephemeral {
                u16::MAX => EPHEMERAL_PORT_START,
                port => port + 1,
            };
            if !self.port_taken(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn route(&self, to: &SocketAddr) -> Option<&Sender<Datagram>> {
        if let Some(sender) = self.hosts.get(to) {
            return Some(sender);
        }

        let local_target = to.ip().is_loopback() || to.ip().is_unspecified();
        self.hosts
            .iter()
            .find(|(bound, _)| {
                bound.port() == to.port()
                    && (bound.ip().is_unspecified() || (local_target && bound.ip().is_loopback()))
            })
            .map(|(_, sender)| sender)
    }
}

/// In-process datagram fabric shared by loopback hosts.
///
/// Hosts bind addresses in the network's directory and exchange frames
/// through unbounded channels. Delivery is lossless and ordered. A host
/// bound to an unspecified address receives traffic for any IP on its
/// port; one bound to a loopback address receives traffic for loopback
/// and unspecified IPs on its port.
#[derive(Clone)]
pub struct LoopbackNetwork {
    directory: Arc<Mutex<Directory>>,
}

impl LoopbackNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self {
            directory: Arc::new(Mutex::new(Directory {
                hosts: HashMap::new(),
                next_ephemeral: EPHEMERAL_PORT_START,
            })),
        }
    }

    /// Returns every bound address, sorted.
    pub fn bound_addresses(&self) -> Vec<SocketAddr> {
        let mut addresses: Vec<SocketAddr> = self.lock().hosts.keys().copied().collect();
        addresses.sort();
        addresses
    }

    pub(crate) fn bind(
        &self,
        requested: Option<SocketAddr>,
    ) -> Result<(SocketAddr, Receiver<Datagram>)> {
        let mut directory = self.lock();

        let address = match requested {
            None => directory
                .ephemeral(IpAddr::V4(Ipv4Addr::LOCALHOST))
                .ok_or(ErrorKind::AddressInUse(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0)))?,
            Some(address) if address.port() == 0 => {
                directory.ephemeral(address.ip()).ok_or(ErrorKind::AddressInUse(address))?
            }
            Some(address) => {
                if directory.port_taken(&address) {
                    return Err(ErrorKind::AddressInUse(address));
                }
                address
            }
        };

        let (sender, receiver) = unbounded();
        directory.hosts.insert(address, sender);
        Ok((address, receiver))
    }

    pub(crate) fn unbind(&self, address: &SocketAddr) {
        self.lock().hosts.remove(address);
    }

    /// Hands `frame` to whoever is bound at `to`. Returns false when nobody is.
    pub(crate) fn deliver(&self, from: SocketAddr, to: SocketAddr, frame: Frame) -> bool {
        let directory = self.lock();
        match directory.route(&to) {
            Some(sender) => sender.send(Datagram { from, frame }).is_ok(),
            None => {
                trace!("Loopback frame from {} to {} has no receiver", from, to);
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Directory> {
        self.directory.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LoopbackNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoopbackNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackNetwork").field("bound", &self.bound_addresses()).finish()
    }
}
