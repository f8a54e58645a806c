/// Peer connection state machine as reported by the packet library.
///
/// Tracks the lifecycle of a peer from slot allocation through the
/// connect handshake to teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerState {
    /// No peer has ever occupied the slot, or the handle is unknown
    #[default]
    Uninitialized,

    /// Connect sent, waiting for the remote host to accept
    Connecting,

    /// Both sides completed the handshake; data can flow
    Connected,

    /// Graceful disconnect sent, waiting for the remote side to confirm
    Disconnecting,

    /// Connection lost without a local request (remote disconnect or timeout)
    Zombie,

    /// Connection closed by this side
    Disconnected,
}

impl PeerState {
    /// Returns true while the peer occupies its slot
    pub fn is_active(&self) -> bool {
        matches!(self, PeerState::Connecting | PeerState::Connected | PeerState::Disconnecting)
    }

    /// Returns true if the connection is fully established
    pub fn is_established(&self) -> bool {
        matches!(self, PeerState::Connected)
    }

    /// Returns true if the peer is disconnecting or already disconnected
    pub fn is_disconnecting(&self) -> bool {
        matches!(self, PeerState::Disconnecting | PeerState::Zombie | PeerState::Disconnected)
    }

    /// Returns true if the peer is in the middle of the connect handshake
    pub fn is_connecting(&self) -> bool {
        matches!(self, PeerState::Connecting)
    }
}
