// src/clock.rs
// =============================================================================
// This module abstracts "what time is it" and "wait for a while".
//
// The rate gate and the fetcher's backoff loop both sleep, sometimes for
// minutes. Taking the clock as a parameter lets the real binary use tokio's
// timer while tests use a manual clock that only pretends to sleep.
//
// Rust concepts:
// - Traits: A shared interface with several implementations
// - async-trait: Lets a trait declare async methods
// - Generics with ?Sized: Accept both concrete clocks and trait objects
// =============================================================================

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of time for everything that waits.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio's timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// Sharing one clock between a test and the code under test
#[async_trait]
impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

#[cfg(test)]
pub use manual::ManualClock;
