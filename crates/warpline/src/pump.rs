//! The per-tick event drain.

use tracing::error;
use warpline_host::{HostEvent, PacketHost};

/// Drains every event `host` has right now and hands each one to `dispatch`.
///
/// Already queued events are taken first; when the queue is empty the host
/// gets one zero-timeout service call. The sweep ends when a service call
/// yields nothing. A library fault is logged and ends the sweep; the host is
/// left untouched. Returns the number of dispatched events.
pub fn drain<H, F>(host: &mut H, mut dispatch: F) -> usize
where
    H: PacketHost,
    F: FnMut(&mut H, HostEvent<H::Peer, H::Packet>),
{
    let mut handled = 0;
    loop {
        let event = match host.check_events() {
            Some(event) => event,
            None => match host.service() {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(e) => {
                    error!("Packet library fault while servicing host: {}", e);
                    break;
                }
            },
        };

        dispatch(host, event);
        handled += 1;
    }
    handled
}
