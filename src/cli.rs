// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// The crawler is meant to be started with no arguments at all: every option
// below defaults to the reference deployment (a-z alphabet, 10 results per
// page, 100 requests per minute). The flags exist so the same binary can
// point at another endpoint or run against a local fake.
//
// Rust concepts:
// - Derive macros: clap generates the parser from the struct definition
// - ValueEnum: Turns a plain enum into a set of accepted flag values
// =============================================================================

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Alphabet;

/// Endpoint queried when no --base-url is given.
pub const DEFAULT_BASE_URL: &str = "http://35.200.185.69:8000/v1/autocomplete";

// This struct represents our entire CLI application
#[derive(Parser, Debug)]
#[command(
    name = "name-harvester",
    version = "0.1.0",
    about = "Enumerate every name behind an autocomplete endpoint",
    long_about = "name-harvester walks the prefix space of an autocomplete API depth-first, \
                  deepening whenever a response is truncated. Progress is checkpointed after \
                  every query so an interrupted crawl resumes where it stopped."
)]
pub struct Cli {
    /// Autocomplete endpoint; queried as <BASE_URL>?query=<prefix>
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Ordered symbols used to build prefixes
    ///
    /// Children of a prefix are explored in this order.
    #[arg(long, default_value = "abcdefghijklmnopqrstuvwxyz")]
    pub alphabet: Alphabet,

    /// Results per response that signal truncation
    ///
    /// A response whose count equals this value is expanded one level deeper.
    #[arg(long, default_value_t = 10)]
    pub page_cap: usize,

    /// Requests admitted per time window
    #[arg(long, default_value_t = 100)]
    pub rate_limit: u32,

    /// Length of the rate-limit window, in seconds
    #[arg(long, default_value_t = 60)]
    pub time_window: u64,

    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = 10)]
    pub request_timeout: u64,

    /// Checkpoint file holding the pending prefix stack (JSON array)
    #[arg(long, default_value = "progress.txt")]
    pub checkpoint: PathBuf,

    /// Output file, one discovered name per line
    #[arg(long, default_value = "all_names.csv")]
    pub output: PathBuf,

    /// What to do when the endpoint answers with a non-429 error status
    #[arg(long, value_enum, default_value_t = ServerErrorPolicy::Skip)]
    pub on_server_error: ServerErrorPolicy,
}

/// Handling of error statuses other than 429.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServerErrorPolicy {
    /// Treat the prefix as empty: no names, no children
    Skip,
    /// Back off and query the same prefix again
    Retry,
}
