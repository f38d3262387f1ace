// src/fetch/backoff.rs
// =============================================================================
// Retry delay schedule for throttled and failed requests.
//
// The delay grows linearly from `initial` by `step` for every consecutive
// failure and never exceeds `max`. With the defaults that is 60s, 90s, 120s,
// ... up to 300s.
// =============================================================================

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub step: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(60),
            step: Duration::from_secs(30),
            max: Duration::from_secs(300),
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based count of prior failures).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.step
            .checked_mul(attempt)
            .and_then(|extra| self.initial.checked_add(extra))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}
