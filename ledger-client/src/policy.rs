//! Dial retry policy.
//!
//! Connection acquisition never gives up: the facade keeps dialing until the
//! service answers. This policy only decides how long to wait between dials.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff between failed dials, bounded by `max_delay`.
///
/// Formula: min(max_delay, initial_delay * 2^(attempt-1)) + random(0..=jitter)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    /// Wait after the first failed dial.
    pub initial_delay: Duration,
    /// Upper bound on the exponential part.
    pub max_delay: Duration,
    /// Random extra wait added to every delay.
    pub jitter: Duration,
}

impl ConnectPolicy {
    /// Redial immediately, forever. This pegs a core while the service is down.
    pub fn busy() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Deterministic part of the delay before dial number `attempt + 1`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Delay to wait after `attempt` consecutive failed dials.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return base;
        }
        base.saturating_add(Duration::from_millis(
            rand::thread_rng().gen_range(0..=jitter_ms),
        ))
    }
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            jitter: Duration::from_millis(10),
        }
    }
}
