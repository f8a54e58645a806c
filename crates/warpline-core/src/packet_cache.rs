use crate::error::{ErrorKind, Result};

/// The single reusable receive buffer.
///
/// Every inbound payload is copied here before it is handed to the framework.
/// The view returned by [`PacketCache::accept`] borrows the cache, so it is
/// only usable until the next packet is accepted; consumers that need the
/// bytes longer must copy them out during the callback.
pub struct PacketCache {
    buffer: Box<[u8]>,
}

impl PacketCache {
    /// Creates a zeroed cache of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self { buffer: vec![0; capacity].into_boxed_slice() }
    }

    /// Reallocates the cache to `capacity` bytes, discarding stale contents.
    ///
    /// Called on every endpoint (re)initialization and stop.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        self.buffer = vec![0; capacity].into_boxed_slice();
    }

    /// Copies `payload` into the cache and returns a view over the copy.
    ///
    /// Payloads larger than the cache are rejected; the cache never grows.
    pub fn accept(&mut self, payload: &[u8]) -> Result<&[u8]> {
        let len = payload.len();
        if len > self.buffer.len() {
            return Err(ErrorKind::PacketTooLarge { len, capacity: self.buffer.len() });
        }

        let slot = &mut self.buffer[..len];
        slot.copy_from_slice(payload);
        Ok(slot)
    }

    /// Returns the capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for PacketCache {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_MAX_PACKET_SIZE_KB * 1024)
    }
}

impl std::fmt::Debug for PacketCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketCache").field("capacity", &self.capacity()).finish()
    }
}
