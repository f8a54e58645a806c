use std::{fmt, sync::Arc};

use tracing::debug;
use warpline_core::error::{ErrorKind, Result};

use super::{host::LoopbackHost, network::LoopbackNetwork};
use crate::{
    host::{HostSettings, PacketLibrary},
    time::{Clock, SystemClock},
};

/// Loopback implementation of [`PacketLibrary`].
///
/// Libraries sharing a network (through [`LoopbackLibrary::network`] and
/// [`LoopbackLibrary::with_clock`]) can reach each other's hosts.
pub struct LoopbackLibrary {
    network: LoopbackNetwork,
    clock: Arc<dyn Clock>,
    initialized: bool,
}

impl LoopbackLibrary {
    /// Creates a library on a fresh network using the system clock.
    pub fn new() -> Self {
        Self::with_clock(LoopbackNetwork::new(), Arc::new(SystemClock))
    }

    /// Creates a library on `network` driven by `clock`.
    pub fn with_clock(network: LoopbackNetwork, clock: Arc<dyn Clock>) -> Self {
        Self { network, clock, initialized: false }
    }

    /// Returns the network hosts of this library bind on.
    pub fn network(&self) -> &LoopbackNetwork {
        &self.network
    }

    /// Returns true between `initialize` and `deinitialize`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Default for LoopbackLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketLibrary for LoopbackLibrary {
    type Host = LoopbackHost;

    fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        debug!("Loopback library initialized");
        Ok(())
    }

    fn deinitialize(&mut self) {
        self.initialized = false;
        debug!("Loopback library deinitialized");
    }

    fn create_host(&mut self, settings: &HostSettings) -> Result<LoopbackHost> {
        if !self.initialized {
            return Err(ErrorKind::LibraryNotInitialized);
        }
        LoopbackHost::bind(self.network.clone(), settings.clone(), Arc::clone(&self.clock))
    }
}

impl fmt::Debug for LoopbackLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackLibrary")
            .field("network", &self.network)
            .field("initialized", &self.initialized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_host_requires_initialize() {
        let mut library = LoopbackLibrary::new();
        match library.create_host(&HostSettings::default()) {
            Err(ErrorKind::LibraryNotInitialized) => {}
            other => panic!("Expected LibraryNotInitialized, got {:?}", other),
        }

        library.initialize().unwrap();
        assert!(library.create_host(&HostSettings::default()).is_ok());

        library.deinitialize();
        assert!(!library.is_initialized());
    }

    #[test]
    fn test_dropping_host_releases_address() {
        let mut library = LoopbackLibrary::new();
        library.initialize().unwrap();
        let settings = HostSettings::server("127.0.0.1:7777".parse().unwrap(), 4, 2, 0);

        let host = library.create_host(&settings).unwrap();
        assert_eq!(library.network().bound_addresses().len(), 1);
        match library.create_host(&settings) {
            Err(ErrorKind::AddressInUse(_)) => {}
            other => panic!("Expected AddressInUse, got {:?}", other),
        }

        drop(host);
        assert!(library.network().bound_addresses().is_empty());
        assert!(library.create_host(&settings).is_ok());
    }
}
