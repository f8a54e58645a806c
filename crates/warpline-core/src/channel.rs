use crate::{
    constants::MAX_CHANNELS,
    error::{ErrorKind, Result},
};

/// Enum to specify whether a packet must arrive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryGuarantee {
    /// Packet may or may not be delivered
    Unreliable,
    /// Packet will be delivered
    Reliable,
}

/// Enum to specify how the library arranges packets of one channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OrderingGuarantee {
    /// Older packets are dropped once a newer one has been delivered.
    Sequenced,
    /// Packets are delivered in send order.
    Ordered,
    /// No arranging; duplicates are still filtered.
    Unsequenced,
}

/// Flags the packet library needs to send on a channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeliveryFlags {
    /// Whether the packet must arrive.
    pub delivery: DeliveryGuarantee,
    /// How the receiving side arranges it.
    pub ordering: OrderingGuarantee,
    /// Whether an unreliable payload larger than the MTU may be split into
    /// unreliable fragments instead of being promoted to reliable.
    pub fragmented: bool,
}

/// Delivery-guarantee mode of a channel.
///
/// A closed set: every combination the library cannot honor is simply not
/// representable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryMode {
    /// Reliable, delivered in order. Pinned to channel 0.
    ReliableOrdered,
    /// Reliable, delivered as it arrives.
    ReliableUnordered,
    /// Fire and forget, delivered as it arrives. Pinned to channel 1.
    UnreliableUnordered,
    /// Unreliable and sequenced, large payloads split into unreliable fragments.
    UnreliableFragmented,
    /// Unreliable and sequenced: stale packets are dropped.
    UnreliableSequenced,
}

impl DeliveryMode {
    /// Resolves the mode into the flags handed to the packet library.
    pub fn flags(self) -> DeliveryFlags {
        let (delivery, ordering, fragmented) = match self {
            DeliveryMode::ReliableOrdered => {
                (DeliveryGuarantee::Reliable, OrderingGuarantee::Ordered, false)
            }
            DeliveryMode::ReliableUnordered => {
                (DeliveryGuarantee::Reliable, OrderingGuarantee::Unsequenced, false)
            }
            DeliveryMode::UnreliableUnordered => {
                (DeliveryGuarantee::Unreliable, OrderingGuarantee::Unsequenced, false)
            }
            DeliveryMode::UnreliableFragmented => {
                (DeliveryGuarantee::Unreliable, OrderingGuarantee::Sequenced, true)
            }
            DeliveryMode::UnreliableSequenced => {
                (DeliveryGuarantee::Unreliable, OrderingGuarantee::Sequenced, false)
            }
        };
        DeliveryFlags { delivery, ordering, fragmented }
    }

    /// Returns true if packets sent with this mode are guaranteed to arrive.
    pub fn is_reliable(self) -> bool {
        self.flags().delivery == DeliveryGuarantee::Reliable
    }
}

/// Normalized channel list of an endpoint.
///
/// Index 0 is always `ReliableOrdered` and index 1 always
/// `UnreliableUnordered`; the framework assumes both baseline channels exist.
/// Supports up to 255 channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelPolicy {
    modes: Vec<DeliveryMode>,
}

impl ChannelPolicy {
    /// Checks the channel count and normalizes the list.
    ///
    /// More than 255 channels is a hard configuration error; everything else
    /// is silently corrected by [`ChannelPolicy::normalize`].
    pub fn validate(channels: &[DeliveryMode]) -> Result<Self> {
        if channels.len() > MAX_CHANNELS {
            return Err(ErrorKind::TooManyChannels { count: channels.len(), limit: MAX_CHANNELS });
        }
        Ok(Self::normalize(channels))
    }

    /// Pins channels 0 and 1, replacing lists shorter than two entries with the defaults.
    pub fn normalize(channels: &[DeliveryMode]) -> Self {
        if channels.len() < 2 {
            return Self::default();
        }

        let mut modes = channels.to_vec();
        modes[0] = DeliveryMode::ReliableOrdered;
        modes[1] = DeliveryMode::UnreliableUnordered;
        Self { modes }
    }

    /// Looks up the mode of a channel, failing for indices past the end.
    pub fn resolve(&self, channel: usize) -> Result<DeliveryMode> {
        self.modes
            .get(channel)
            .copied()
            .ok_or(ErrorKind::ChannelOutOfRange { channel, count: self.modes.len() })
    }

    /// Returns the number of configured channels.
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    /// Always false: a normalized policy has at least two channels.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Returns the normalized modes, indexed by channel.
    pub fn modes(&self) -> &[DeliveryMode] {
        &self.modes
    }
}

impl Default for ChannelPolicy {
    fn default() -> Self {
        Self { modes: vec![DeliveryMode::ReliableOrdered, DeliveryMode::UnreliableUnordered] }
    }
}
