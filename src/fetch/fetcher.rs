// src/fetch/fetcher.rs
// =============================================================================
// The Fetcher turns "query this prefix" into a clean QueryOutcome.
//
// Every attempt passes the rate gate first, retries included, so a flaky
// network uses up quota faster. Then:
// - 200       -> the parsed outcome
// - 429       -> sleep per the backoff schedule, try again
// - network   -> same as 429
// - other     -> depends on ServerErrorPolicy: skip (empty outcome) or retry
//
// The retry loop has no upper bound. A dead endpoint keeps the crawl waiting
// at the capped delay until an operator stops it.
// =============================================================================

use std::time::Duration;

use super::{Backoff, Clock, FetchError, QueryEndpoint, QueryOutcome, RateGate};
use crate::cli::ServerErrorPolicy;

/// Counters describing how the fetches went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Attempts admitted by the rate gate
    pub admitted: u64,
    /// 429 responses
    pub throttled: u64,
    /// Network failures and unreadable bodies
    pub transport_failures: u64,
    /// Prefixes given up on because of an error status
    pub skipped: u64,
}

pub struct Fetcher<E, C> {
    endpoint: E,
    clock: C,
    gate: RateGate,
    backoff: Backoff,
    policy: ServerErrorPolicy,
    stats: FetchStats,
}

impl<E: QueryEndpoint, C: Clock> Fetcher<E, C> {
    pub fn new(endpoint: E, clock: C, gate: RateGate) -> Self {
        Self {
            endpoint,
            clock,
            gate,
            backoff: Backoff::default(),
            policy: ServerErrorPolicy::Skip,
            stats: FetchStats::default(),
        }
    }

    pub fn with_policy(mut self, policy: ServerErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    /// Query `prefix` until the endpoint gives a usable answer.
    pub async fn fetch(&mut self, prefix: &str) -> QueryOutcome {
        let mut failures: u32 = 0;

        loop {
            // Every attempt costs quota, retries included
            self.gate.admit(&self.clock).await;
            self.stats.admitted += 1;
            tracing::debug!(prefix, window_used = self.gate.admitted(), "querying");

            // Success leaves the loop right away
            let error = match self.endpoint.query(prefix).await {
                Ok(outcome) => return outcome,
                Err(error) => error,
            };

            match &error {
                FetchError::Throttled => {
                    self.stats.throttled += 1;
                    let delay = self.backoff.delay(failures);
                    tracing::warn!("⚠️ 429 Rate Limit - Sleeping {}s...", delay.as_secs());
                    self.wait(delay).await;
                }
                FetchError::Transport(_) | FetchError::Decode(_) => {
                    self.stats.transport_failures += 1;
                    let delay = self.backoff.delay(failures);
                    tracing::warn!(
                        "⚠️ Network error for '{}': {}. Retrying in {}s...",
                        prefix,
                        error,
                        delay.as_secs()
                    );
                    self.wait(delay).await;
                }
                FetchError::Status(code) => match self.policy {
                    ServerErrorPolicy::Skip => {
                        self.stats.skipped += 1;
                        tracing::error!("❌ Error {} for prefix '{}'", code, prefix);
                        return QueryOutcome::empty();
                    }
                    ServerErrorPolicy::Retry => {
                        let delay = self.backoff.delay(failures);
                        tracing::warn!(
                            "❌ Error {} for prefix '{}'. Retrying in {}s...",
                            code,
                            prefix,
                            delay.as_secs()
                        );
                        self.wait(delay).await;
                    }
                },
            }

            // Only reached after a sleep; the next delay will be longer
            failures = failures.saturating_add(1);
        }
    }

    async fn wait(&self, delay: Duration) {
        self.clock.sleep(delay).await;
    }
}
