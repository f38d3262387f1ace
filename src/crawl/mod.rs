// src/crawl/mod.rs
// =============================================================================
// This module handles the prefix crawl itself.
//
// Features:
// - Depth-first walk of the prefix tree, deepening only on truncated answers
// - Checkpoint after every query so a killed crawl resumes where it was
// - Deduplicated, append-only output that doubles as the resume state
//
// Submodules:
// - frontier: The stack of pending prefixes and its checkpoint file
// - sink: The set of names found so far and the output file
// - driver: The loop that ties fetcher, frontier and sink together
// =============================================================================

mod driver;
mod frontier;
mod sink;

pub use driver::{CrawlSummary, Crawler, StepReport};
pub use frontier::{CheckpointFile, Frontier, Prefix};
pub use sink::{Name, NameSink};
