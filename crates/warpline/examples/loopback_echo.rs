//! Echo server and client talking over the in-process loopback library.
//!
//! Run:
//! - cargo run -p warpline --example loopback_echo
//! - cargo run -p warpline --example loopback_echo -- 10 50
//!   (sends 10 messages, 50ms apart)
//! - RUST_LOG=warpline=debug cargo run -p warpline --example loopback_echo

use std::{env, sync::Arc, thread, time::Duration};

use tracing_subscriber::EnvFilter;
use warpline::{prelude::*, LoopbackNetwork};
use warpline_host::SystemClock;

/// Remembers every payload so it can be echoed once the tick returns.
#[derive(Default)]
struct EchoServer {
    pending: Vec<(ConnectionId, Vec<u8>)>,
}

impl TransportHandler for EchoServer {
    fn on_server_connected(&mut self, id: ConnectionId) {
        println!("[server] connection {} joined", id);
    }

    fn on_server_disconnected(&mut self, id: ConnectionId) {
        println!("[server] connection {} left", id);
    }

    fn on_server_data_received(&mut self, id: ConnectionId, data: &[u8]) {
        self.pending.push((id, data.to_vec()));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Args: [count] [interval_ms]
    let mut args = env::args().skip(1);
    let count: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(5);
    let interval_ms: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(100);

    let network = LoopbackNetwork::new();
    let clock = Arc::new(SystemClock);
    let mut server = Transport::new(
        LoopbackLibrary::with_clock(network.clone(), clock.clone()),
        EchoServer::default(),
    );
    let mut client =
        Transport::new(LoopbackLibrary::with_clock(network, clock), CollectingHandler::new());

    server.try_server_start()?;
    client.try_client_connect("127.0.0.1")?;
    println!("{} / {}", server, client);

    let mut sent = 0;
    let mut echoed = 0;
    while echoed < count {
        client.tick();
        server.tick();

        for (id, data) in std::mem::take(&mut server.handler_mut().pending) {
            server.server_send(id, 0, &data);
        }

        for event in client.handler_mut().drain() {
            match event {
                TransportEvent::ClientConnected => println!("[client] connected"),
                TransportEvent::ClientData(data) => {
                    echoed += 1;
                    println!("[client] echo: {}", String::from_utf8_lossy(&data));
                }
                TransportEvent::ClientDisconnected => {
                    println!("[client] lost the server");
                    return Ok(());
                }
                _ => {}
            }
        }

        if client.client_connected() && sent < count {
            let message = format!("hello {}", sent);
            if client.client_send(0, message.as_bytes()) {
                sent += 1;
            }
        }

        thread::sleep(Duration::from_millis(interval_ms));
    }

    println!("client ping: {} ms", client.client_ping());
    client.client_disconnect();
    server.tick();
    server.server_stop();
    Ok(())
}
