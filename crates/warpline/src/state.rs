use std::fmt;

/// Lifecycle of one endpoint role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EndpointState {
    /// Never started.
    #[default]
    Uninitialized,
    /// Owns a live host.
    Started,
    /// Stopped after running; the host is gone.
    Stopped,
}

/// Process-wide state of the packet library.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LibraryState {
    /// `initialize` has not run, or the library was shut down.
    #[default]
    NotInitialized,
    /// Hosts may be created.
    Initialized,
}

/// Which roles the transport currently plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportMode {
    /// Server and client are both active in this process.
    HostClient,
    /// Only the server is active.
    DedicatedServer,
    /// Only the client is active.
    Client,
    /// Neither role is active.
    Disconnected,
}

impl TransportMode {
    /// Derives the mode from the active roles.
    pub fn from_roles(server_active: bool, client_active: bool) -> Self {
        match (server_active, client_active) {
            (true, true) => TransportMode::HostClient,
            (true, false) => TransportMode::DedicatedServer,
            (false, true) => TransportMode::Client,
            (false, false) => TransportMode::Disconnected,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TransportMode::HostClient => "HostClient mode",
            TransportMode::DedicatedServer => "Dedicated Server mode",
            TransportMode::Client => "Client mode",
            TransportMode::Disconnected => "disconnected",
        };
        f.write_str(text)
    }
}
