use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

/// Time source a loopback host reads once per `service` or `connect` call.
///
/// Peer timeouts, keep-alive pings and round-trip times are all measured
/// against it.
pub trait Clock: Send + Sync + 'static {
    /// Returns the host's notion of now.
    fn now(&self) -> Instant;
}

/// Wall clock for running loopback hosts in real time, as the demo does.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock shared by every host of a test network. Time stands still until
/// [`ManualClock::advance`], so timeouts and round-trip times are exact.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    pub fn new() -> Self {
        Self { now: Mutex::new(Instant::now()) }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
