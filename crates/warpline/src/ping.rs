use std::time::Duration;

/// Samples the client round-trip time every few ticks.
///
/// The framework reads the sampled value instead of the live one, so the
/// reported ping only changes at a steady cadence.
#[derive(Clone, Debug, Default)]
pub struct PingSampler {
    interval: Option<u32>,
    frames: u32,
    current_ms: u32,
}

impl PingSampler {
    /// Creates a sampler taking a sample every `interval` ticks. None disables sampling.
    pub fn new(interval: Option<u32>) -> Self {
        Self { interval, frames: 0, current_ms: 0 }
    }

    /// Advances by one tick. `rtt` is read only when a sample is due;
    /// None (no live client peer) samples as 0.
    pub fn tick(&mut self, rtt: impl FnOnce() -> Option<Duration>) {
        let Some(interval) = self.interval else { return };

        self.frames += 1;
        if self.frames >= interval {
            self.current_ms = rtt()
                .map(|rtt| u32::try_from(rtt.as_millis()).unwrap_or(u32::MAX))
                .unwrap_or(0);
            self.frames = 0;
        }
    }

    /// Returns the last sample in milliseconds.
    pub fn current_ms(&self) -> u32 {
        self.current_ms
    }

    /// Forgets the last sample.
    pub fn reset(&mut self) {
        self.frames = 0;
        self.current_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_on_interval() {
        let mut sampler = PingSampler::new(Some(3));
        let rtt = || Some(Duration::from_millis(42));

        sampler.tick(rtt);
        sampler.tick(rtt);
        assert_eq!(sampler.current_ms(), 0);

        sampler.tick(rtt);
        assert_eq!(sampler.current_ms(), 42);

        // Lost peer reads as zero on the next sample
        for _ in 0..3 {
            sampler.tick(|| None);
        }
        assert_eq!(sampler.current_ms(), 0);
    }

    #[test]
    fn test_disabled_sampler_never_reads() {
        let mut sampler = PingSampler::new(None);
        for _ in 0..500 {
            sampler.tick(|| panic!("rtt read while sampling is disabled"));
        }
        assert_eq!(sampler.current_ms(), 0);
    }
}
