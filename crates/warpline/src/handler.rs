//! Callbacks from the transport into the host framework.

use std::collections::VecDeque;

use crate::registry::ConnectionId;

/// Notifications the transport raises while it is ticked.
///
/// Every method has a no-op default so a framework only implements what it
/// listens to. Data callbacks borrow the shared packet cache: the slice is
/// only valid for the duration of the call.
pub trait TransportHandler {
    /// A client finished connecting to the server and was assigned `id`.
    fn on_server_connected(&mut self, _id: ConnectionId) {}

    /// A registered client disconnected or timed out.
    fn on_server_disconnected(&mut self, _id: ConnectionId) {}

    /// A registered client sent `data`.
    fn on_server_data_received(&mut self, _id: ConnectionId, _data: &[u8]) {}

    /// The client finished connecting.
    fn on_client_connected(&mut self) {}

    /// The client lost its connection.
    fn on_client_disconnected(&mut self) {}

    /// The server sent `data` to the client.
    fn on_client_data_received(&mut self, _data: &[u8]) {}

    /// The server endpoint started listening.
    fn on_server_startup(&mut self) {}

    /// The server endpoint stopped.
    fn on_server_shutdown(&mut self) {}

    /// The client endpoint started connecting.
    fn on_client_startup(&mut self) {}

    /// The client endpoint was torn down.
    fn on_client_shutdown(&mut self) {}
}

/// An owned copy of a handler notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// See [`TransportHandler::on_server_connected`].
    ServerConnected(ConnectionId),
    /// See [`TransportHandler::on_server_disconnected`].
    ServerDisconnected(ConnectionId),
    /// See [`TransportHandler::on_server_data_received`].
    ServerData(ConnectionId, Vec<u8>),
    /// See [`TransportHandler::on_client_connected`].
    ClientConnected,
    /// See [`TransportHandler::on_client_disconnected`].
    ClientDisconnected,
    /// See [`TransportHandler::on_client_data_received`].
    ClientData(Vec<u8>),
    /// See [`TransportHandler::on_server_startup`].
    ServerStartup,
    /// See [`TransportHandler::on_server_shutdown`].
    ServerShutdown,
    /// See [`TransportHandler::on_client_startup`].
    ClientStartup,
    /// See [`TransportHandler::on_client_shutdown`].
    ClientShutdown,
}

/// Handler that copies every notification into a queue.
///
/// Trades one allocation per received payload for events that outlive the
/// tick they were raised in.
#[derive(Debug, Default)]
pub struct CollectingHandler {
    events: VecDeque<TransportEvent>,
}

impl CollectingHandler {
    /// Creates an empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pops the oldest event.
    pub fn pop(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }

    /// Takes every queued event.
    pub fn drain(&mut self) -> Vec<TransportEvent> {
        self.events.drain(..).collect()
    }

    /// Returns the queued events without consuming them.
    pub fn events(&self) -> &VecDeque<TransportEvent> {
        &self.events
    }

    /// Returns the number of queued events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl TransportHandler for CollectingHandler {
    fn on_server_connected(&mut self, id: ConnectionId) {
        self.events.push_back(TransportEvent::ServerConnected(id));
    }

    fn on_server_disconnected(&mut self, id: ConnectionId) {
        self.events.push_back(TransportEvent::ServerDisconnected(id));
    }

    fn on_server_data_received(&mut self, id: ConnectionId, data: &[u8]) {
        self.events.push_back(TransportEvent::ServerData(id, data.to_vec()));
    }

    fn on_client_connected(&mut self) {
        self.events.push_back(TransportEvent::ClientConnected);
    }

    fn on_client_disconnected(&mut self) {
        self.events.push_back(TransportEvent::ClientDisconnected);
    }

    fn on_client_data_received(&mut self, data: &[u8]) {
        self.events.push_back(TransportEvent::ClientData(data.to_vec()));
    }

    fn on_server_startup(&mut self) {
        self.events.push_back(TransportEvent::ServerStartup);
    }

    fn on_server_shutdown(&mut self) {
        self.events.push_back(TransportEvent::ServerShutdown);
    }

    fn on_client_startup(&mut self) {
        self.events.push_back(TransportEvent::ClientStartup);
    }

    fn on_client_shutdown(&mut self) {
        self.events.push_back(TransportEvent::ClientShutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_handler_copies_payloads() {
        let mut handler = CollectingHandler::new();
        let mut buffer = vec![1u8, 2, 3];

        handler.on_server_data_received(ConnectionId::new(4), &buffer);
        buffer[0] = 9;
        handler.on_client_data_received(&buffer);

        assert_eq!(
            handler.drain(),
            vec![
                TransportEvent::ServerData(ConnectionId::new(4), vec![1, 2, 3]),
                TransportEvent::ClientData(vec![9, 2, 3]),
            ]
        );
        assert!(handler.is_empty());
    }

    #[test]
    fn test_default_methods_are_noops() {
        struct Silent;
        impl TransportHandler for Silent {}

        let mut silent = Silent;
        silent.on_server_connected(ConnectionId::FIRST);
        silent.on_client_data_received(b"ignored");
        silent.on_server_shutdown();
    }
}
