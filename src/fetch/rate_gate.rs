// src/fetch/rate_gate.rs
// =============================================================================
// A fixed-window request counter.
//
// Every request must be admitted by the gate first. The gate counts
// admissions inside the current window; once the count reaches the limit the
// next caller sleeps until the window is over, then a fresh window starts.
//
// This is deliberately not a sliding window: a burst at the end of one window
// followed by a burst at the start of the next can briefly exceed the limit.
// The endpoint's own 429 responses cover that case.
// =============================================================================

use std::time::{Duration, Instant};

use super::Clock;

#[derive(Debug)]
pub struct RateGate {
    limit: u32,
    window: Duration,
    admitted: u32,
    window_start: Option<Instant>,
}

impl RateGate {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            admitted: 0,
            window_start: None,
        }
    }

    /// Admit one request, sleeping first if this window's quota is used up.
    ///
    /// Returns how long the caller was held back.
    pub async fn admit<C: Clock + ?Sized>(&mut self, clock: &C) -> Duration {
        let mut waited = Duration::ZERO;
        let now = clock.now();
        // The first admission opens the first window
        let start = *self.window_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(start);

        if self.admitted >= self.limit {
            // Quota used up: wait for whatever is left of this window
            if elapsed < self.window {
                waited = self.window - elapsed;
                tracing::info!(
                    "🕒 Rate limit hit. Sleeping {:.1}s",
                    waited.as_secs_f64()
                );
                clock.sleep(waited).await;
            }
            self.reset(clock.now());
        } else if elapsed >= self.window {
            // Window ran out before the quota did
            self.reset(now);
        }

        self.admitted += 1;
        waited
    }

    /// Admissions counted in the current window.
    pub fn admitted(&self) -> u32 {
        self.admitted
    }

    fn reset(&mut self, now: Instant) {
        self.admitted = 0;
        self.window_start = Some(now);
    }
}
