//! Bind and target address resolution.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};

use tracing::debug;
use warpline_core::{
    config::Config,
    error::{ErrorKind, Result},
};

/// Returns the address a server binds to.
///
/// Bind-all servers use `0.0.0.0`, or the IPv6 dual-stack wildcard `::` when
/// `force_ipv6_wildcard` is set. Otherwise `server_bind_address` is parsed as
/// an IP literal first and resolved as a hostname second.
pub fn bind_address(config: &Config, port: u16) -> Result<SocketAddr> {
    if config.server_bind_all {
        let ip = if config.force_ipv6_wildcard {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };
        return Ok(SocketAddr::new(ip, port));
    }

    resolve(&config.server_bind_address, port)
}

/// Returns the address a client dials for `host` on `port`.
pub fn target_address(host: &str, port: u16) -> Result<SocketAddr> {
    resolve(host, port)
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let host = host.trim();
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    let unresolved = || ErrorKind::AddressResolution { address: host.to_owned() };
    if host.is_empty() {
        return Err(unresolved());
    }

    let address = (host, port)
        .to_socket_addrs()
        .map_err(|_| unresolved())?
        .next()
        .ok_or_else(unresolved)?;
    debug!("Resolved {} to {}", host, address);
    Ok(address)
}
