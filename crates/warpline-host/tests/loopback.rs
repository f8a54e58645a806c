//! Integration tests for the loopback packet library.
//!
//! These tests drive a server host and a client host over a shared
//! network and check the handshake, data flow, pings, timeouts and
//! immediate disconnects.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use warpline_core::{channel::DeliveryMode, error::ErrorKind};
use warpline_host::{
    HostEvent, HostSettings, LoopbackHost, LoopbackLibrary, LoopbackNetwork, ManualClock,
    PacketHost, PacketLibrary, PeerId, PeerState, TimeoutSettings, loopback::PING_INTERVAL,
};

struct Pair {
    clock: Arc<ManualClock>,
    server: LoopbackHost,
    client: LoopbackHost,
    server_addr: SocketAddr,
}

fn libraries(clock: &Arc<ManualClock>) -> (LoopbackLibrary, LoopbackLibrary) {
    let network = LoopbackNetwork::new();
    let mut a = LoopbackLibrary::with_clock(network.clone(), clock.clone());
    let mut b = LoopbackLibrary::with_clock(network, clock.clone());
    a.initialize().unwrap();
    b.initialize().unwrap();
    (a, b)
}

fn pair(peer_limit: usize) -> Pair {
    let clock = Arc::new(ManualClock::new());
    let (mut server_lib, mut client_lib) = libraries(&clock);
    let server_addr: SocketAddr = "0.0.0.0:7777".parse().unwrap();
    let server =
        server_lib.create_host(&HostSettings::server(server_addr, peer_limit, 2, 0)).unwrap();
    let client = client_lib.create_host(&HostSettings::client(2, 0)).unwrap();
    Pair { clock, server, client, server_addr }
}

fn drain(host: &mut LoopbackHost) -> Vec<HostEvent<PeerId, Vec<u8>>> {
    let mut events = Vec::new();
    loop {
        let event = match host.check_events() {
            Some(event) => Some(event),
            None => host.service().unwrap(),
        };
        let Some(event) = event else { break };
        events.push(match event {
            HostEvent::Connect { peer } => HostEvent::Connect { peer },
            HostEvent::Disconnect { peer } => HostEvent::Disconnect { peer },
            HostEvent::Timeout { peer } => HostEvent::Timeout { peer },
            HostEvent::Receive { peer, channel, packet } => {
                HostEvent::Receive { peer, channel, packet: packet.as_ref().to_vec() }
            }
        });
    }
    events
}

fn connect(pair: &mut Pair) -> (PeerId, PeerId) {
    let target: SocketAddr = "127.0.0.1:7777".parse().unwrap();
    let client_peer = pair.client.connect(target, 2).unwrap();
    assert_eq!(pair.client.peer_state(client_peer), PeerState::Connecting);

    pair.client.flush();
    let server_events = drain(&mut pair.server);
    let server_peer = match server_events.as_slice() {
        [HostEvent::Connect { peer }] => *peer,
        other => panic!("Expected one Connect, got {:?}", other),
    };

    let client_events = drain(&mut pair.client);
    assert_eq!(client_events, vec![HostEvent::Connect { peer: client_peer }]);
    (client_peer, server_peer)
}

#[test]
fn test_handshake_through_wildcard_bind() {
    let mut pair = pair(4);
    let (client_peer, server_peer) = connect(&mut pair);

    assert_eq!(pair.client.peer_state(client_peer), PeerState::Connected);
    assert_eq!(pair.server.peer_state(server_peer), PeerState::Connected);
    assert_eq!(
        pair.server.peer_address(server_peer),
        Some(pair.client.local_addr().unwrap())
    );
    assert_eq!(pair.server.local_addr().unwrap(), pair.server_addr);
}

#[test]
fn test_payload_delivery_preserves_channel() {
    let mut pair = pair(4);
    let (client_peer, server_peer) = connect(&mut pair);

    pair.client.send(client_peer, 1, DeliveryMode::UnreliableUnordered, &[7u8; 64]).unwrap();
    pair.client.send(client_peer, 0, DeliveryMode::ReliableOrdered, b"second").unwrap();
    pair.client.flush();

    let events = drain(&mut pair.server);
    assert_eq!(
        events,
        vec![
            HostEvent::Receive { peer: server_peer, channel: 1, packet: vec![7u8; 64] },
            HostEvent::Receive { peer: server_peer, channel: 0, packet: b"second".to_vec() },
        ]
    );
}

#[test]
fn test_send_validation() {
    let clock = Arc::new(ManualClock::new());
    let (mut server_lib, mut client_lib) = libraries(&clock);
    let mut server = server_lib
        .create_host(&HostSettings::server("127.0.0.1:7000".parse().unwrap(), 1, 2, 0))
        .unwrap();
    let mut client = client_lib.create_host(&HostSettings::client(2, 16)).unwrap();

    let peer = client.connect("127.0.0.1:7000".parse().unwrap(), 2).unwrap();
    match client.send(peer, 0, DeliveryMode::ReliableOrdered, b"early") {
        Err(ErrorKind::PeerNotConnected) => {}
        other => panic!("Expected PeerNotConnected, got {:?}", other),
    }

    client.flush();
    drain(&mut server);
    drain(&mut client);

    match client.send(peer, 2, DeliveryMode::ReliableOrdered, b"x") {
        Err(ErrorKind::ChannelOutOfRange { channel: 2, count: 2 }) => {}
        other => panic!("Expected ChannelOutOfRange, got {:?}", other),
    }
    match client.send(peer, 0, DeliveryMode::ReliableOrdered, &[0u8; 17]) {
        Err(ErrorKind::PacketTooLarge { len: 17, capacity: 16 }) => {}
        other => panic!("Expected PacketTooLarge, got {:?}", other),
    }
    assert!(client.send(peer, 0, DeliveryMode::ReliableOrdered, &[0u8; 16]).is_ok());
}

#[test]
fn test_peer_limit_refuses_extra_clients() {
    let clock = Arc::new(ManualClock::new());
    let network = LoopbackNetwork::new();
    let mut library = LoopbackLibrary::with_clock(network, clock);
    library.initialize().unwrap();

    let mut server = library
        .create_host(&HostSettings::server("127.0.0.1:7100".parse().unwrap(), 1, 2, 0))
        .unwrap();
    let mut first = library.create_host(&HostSettings::client(2, 0)).unwrap();
    let mut second = library.create_host(&HostSettings::client(2, 0)).unwrap();
    let target = "127.0.0.1:7100".parse().unwrap();

    let first_peer = first.connect(target, 2).unwrap();
    first.flush();
    assert_eq!(drain(&mut server).len(), 1);
    assert_eq!(drain(&mut first), vec![HostEvent::Connect { peer: first_peer }]);

    let second_peer = second.connect(target, 2).unwrap();
    second.flush();
    assert!(drain(&mut server).is_empty());
    assert_eq!(drain(&mut second), vec![HostEvent::Disconnect { peer: second_peer }]);
    assert_eq!(server.active_peers(), 1);
}

#[test]
fn test_disconnect_now_discards_queued_traffic() {
    let mut pair = pair(4);
    let (client_peer, server_peer) = connect(&mut pair);

    pair.client.send(client_peer, 0, DeliveryMode::ReliableOrdered, b"never").unwrap();
    pair.client.disconnect_now(client_peer);
    pair.client.flush();

    // Local side learns about it through its own event queue
    assert_eq!(drain(&mut pair.client), vec![HostEvent::Disconnect { peer: client_peer }]);
    assert_eq!(drain(&mut pair.server), vec![HostEvent::Disconnect { peer: server_peer }]);
    assert_eq!(pair.client.peer_state(client_peer), PeerState::Disconnected);
    assert_eq!(pair.server.peer_state(server_peer), PeerState::Zombie);

    // A second immediate disconnect is a no-op
    pair.client.disconnect_now(client_peer);
    assert!(drain(&mut pair.client).is_empty());
}

#[test]
fn test_ping_measures_round_trip() {
    let mut pair = pair(4);
    let (client_peer, _) = connect(&mut pair);
    assert_eq!(pair.client.round_trip_time(client_peer), None);

    pair.clock.advance(PING_INTERVAL);
    drain(&mut pair.client);
    pair.clock.advance(Duration::from_millis(20));
    drain(&mut pair.server);
    pair.clock.advance(Duration::from_millis(20));
    drain(&mut pair.client);

    assert_eq!(pair.client.round_trip_time(client_peer), Some(Duration::from_millis(40)));
}

#[test]
fn test_silent_peer_times_out() {
    let mut pair = pair(4);
    let (_, server_peer) = connect(&mut pair);
    pair.server.set_timeout(
        server_peer,
        TimeoutSettings { limit: 32, minimum_ms: 100, maximum_ms: 300 },
    );

    pair.clock.advance(Duration::from_millis(200));
    assert!(drain(&mut pair.server).is_empty());

    pair.clock.advance(Duration::from_millis(200));
    assert_eq!(drain(&mut pair.server), vec![HostEvent::Timeout { peer: server_peer }]);
    assert_eq!(pair.server.peer_address(server_peer), None);
    assert_eq!(pair.server.peer_state(server_peer), PeerState::Zombie);
}

#[test]
fn test_graceful_disconnect_delivers_queued_traffic() {
    let mut pair = pair(4);
    let (client_peer, server_peer) = connect(&mut pair);

    pair.client.send(client_peer, 0, DeliveryMode::ReliableOrdered, b"last words").unwrap();
    pair.client.disconnect(client_peer);
    assert_eq!(pair.client.peer_state(client_peer), PeerState::Disconnecting);
    match pair.client.send(client_peer, 0, DeliveryMode::ReliableOrdered, b"too late") {
        Err(ErrorKind::PeerNotConnected) => {}
        other => panic!("Expected PeerNotConnected, got {:?}", other),
    }

    // No local event until the server confirms
    pair.client.flush();
    assert!(pair.client.check_events().is_none());

    assert_eq!(
        drain(&mut pair.server),
        vec![
            HostEvent::Receive { peer: server_peer, channel: 0, packet: b"last words".to_vec() },
            HostEvent::Disconnect { peer: server_peer },
        ]
    );
    assert_eq!(pair.server.peer_state(server_peer), PeerState::Zombie);

    assert_eq!(drain(&mut pair.client), vec![HostEvent::Disconnect { peer: client_peer }]);
    assert_eq!(pair.client.peer_state(client_peer), PeerState::Disconnected);
}

#[test]
fn test_unconfirmed_graceful_disconnect_times_out() {
    let mut pair = pair(4);
    let (client_peer, _) = connect(&mut pair);
    pair.client.set_timeout(
        client_peer,
        TimeoutSettings { limit: 32, minimum_ms: 100, maximum_ms: 300 },
    );

    // The server never services, so the confirmation never comes
    pair.client.disconnect(client_peer);
    pair.client.flush();
    pair.clock.advance(Duration::from_millis(400));
    assert_eq!(drain(&mut pair.client), vec![HostEvent::Timeout { peer: client_peer }]);
    assert_eq!(pair.client.peer_state(client_peer), PeerState::Zombie);
}

#[test]
fn test_graceful_disconnect_while_connecting_is_immediate() {
    let mut pair = pair(4);
    let peer = pair.client.connect("127.0.0.1:7777".parse().unwrap(), 2).unwrap();

    pair.client.disconnect(peer);
    assert_eq!(pair.client.peer_state(peer), PeerState::Disconnected);
    assert_eq!(pair.client.check_events(), Some(HostEvent::Disconnect { peer }));

    // The connect request never leaves the host
    pair.client.flush();
    assert!(drain(&mut pair.server).is_empty());
    assert_eq!(pair.server.active_peers(), 0);
}

#[test]
fn test_connect_from_reused_slot_replaces_stale_peer() {
    let mut pair = pair(4);
    let (client_peer, server_peer) = connect(&mut pair);
    pair.client.set_timeout(
        client_peer,
        TimeoutSettings { limit: 32, minimum_ms: 100, maximum_ms: 300 },
    );

    // Client gives up while the server still thinks it is connected
    pair.clock.advance(Duration::from_millis(400));
    assert_eq!(drain(&mut pair.client), vec![HostEvent::Timeout { peer: client_peer }]);

    let target: SocketAddr = "127.0.0.1:7777".parse().unwrap();
    assert_eq!(pair.client.connect(target, 2).unwrap(), client_peer);
    pair.client.flush();
    assert_eq!(
        drain(&mut pair.server),
        vec![HostEvent::Disconnect { peer: server_peer }, HostEvent::Connect { peer: server_peer }]
    );
    assert_eq!(pair.server.active_peers(), 1);
    assert_eq!(drain(&mut pair.client), vec![HostEvent::Connect { peer: client_peer }]);
}
