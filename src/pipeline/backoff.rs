use rand::Rng;
use std::time::Duration;

use crate::config::ReconnectConfig;

/// Fraction of a delay that jitter may shave off.
const JITTER_FACTOR: f64 = 0.2;

/// Bounded exponential reconnect delay.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: bool,
}

impl ReconnectPolicy {
    pub fn new(config: &ReconnectConfig) -> Self {
        let initial = Duration::from_millis(config.initial_delay_ms);
        Self {
            initial,
            max: Duration::from_millis(config.max_delay_ms).max(initial),
            multiplier: if config.multiplier.is_nan() {
                1.0
            } else {
                config.multiplier.max(1.0)
            },
            jitter: config.jitter,
        }
    }

    /// Delay before reconnect number `attempt` (0-based). Never exceeds the cap;
    /// jitter only ever shortens it.
    pub fn delay(&self, attempt: u32) -> Duration {
        let max = self.max.as_secs_f64();
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let mut secs = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        // also catches overflow to infinity and NaN
        if !(secs < max) {
            secs = max;
        }

        if self.jitter && secs > 0.0 {
            let shave = rand::thread_rng().gen_range(0.0..JITTER_FACTOR);
            secs *= 1.0 - shave;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(self.max).min(self.max)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(&ReconnectConfig::default())
    }
}
