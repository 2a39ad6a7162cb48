//! # Exponential Backoff
//!
//! Reconnect delays for the change-watcher. Each failed attempt doubles the
//! base delay up to a cap; a bounded random jitter is added on top so many
//! watchers restarting together do not hit the API server in lockstep.
//!
//! Default sequence (base, before jitter): 800ms, 1.6s, 3.2s, 6.4s, 12.8s, 25.6s, 30s (max)

use rand::Rng;
use std::time::Duration;

/// Exponential backoff calculator
///
/// Tracks the current attempt; call [`ExponentialBackoff::reset`] once a
/// connection proves healthy.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// First delay
    initial: Duration,
    /// Ceiling for any delay, jitter included
    max: Duration,
    /// Extra random delay as a fraction of the base delay (0.0 - 1.0)
    jitter: f64,
    /// Number of delays handed out since the last reset
    attempt: u32,
}

impl ExponentialBackoff {
    /// Create a backoff doubling from `initial` up to `max`, with up to
    /// `jitter` x base of random extra delay.
    ///
    /// `jitter` is clamped into `0.0..=1.0` and `max` is raised to `initial`
    /// if it is smaller.
    #[must_use]
    pub fn new(initial: Duration, max: Duration, jitter: f64) -> Self {
        Self {
            initial,
            max: max.max(initial),
            jitter: jitter.clamp(0.0, 1.0),
            attempt: 0,
        }
    }

    /// Next delay including jitter, advancing the sequence.
    pub fn next_backoff(&mut self) -> Duration {
        let base = self.next_base();
        let extra = if self.jitter > 0.0 {
            base.mul_f64(rand::thread_rng().gen_range(0.0..=self.jitter))
        } else {
            Duration::ZERO
        };
        (base + extra).min(self.max)
    }

    /// Next delay without jitter, advancing the sequence.
    pub fn next_base(&mut self) -> Duration {
        let delay = Self::calculate_for_attempt(self.attempt, self.initial, self.max);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Restart from the initial delay.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of delays handed out since the last reset.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Base delay for the given 0-indexed attempt (stateless).
    #[must_use]
    pub fn calculate_for_attempt(attempt: u32, initial: Duration, max: Duration) -> Duration {
        // 2^31 x any sane initial delay is past the cap already
        let factor = 2u32.saturating_pow(attempt.min(31));
        initial.saturating_mul(factor).min(max)
    }
}
