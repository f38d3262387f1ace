// src/fetch/mod.rs
// =============================================================================
// This module contains everything needed to ask the endpoint about a prefix.
//
// Submodules:
// - rate_gate: Keeps us under the endpoint's requests-per-window quota
// - backoff: Delay schedule for throttled and failed requests
// - endpoint: The HTTP call itself and its error taxonomy
// - fetcher: Retry policy tying the three together
// =============================================================================

mod backoff;
mod endpoint;
mod fetcher;
mod rate_gate;

pub use crate::clock::Clock;
pub use backoff::Backoff;
pub use endpoint::{FetchError, HttpEndpoint, QueryEndpoint, QueryOutcome};
pub use fetcher::{FetchStats, Fetcher};
pub use rate_gate::RateGate;
