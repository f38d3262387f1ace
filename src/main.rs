// src/main.rs
// =============================================================================
// This is the entry point of the name-harvester CLI.
//
// What happens here:
// 1. Set up logging (RUST_LOG, defaults to info) on stdout
// 2. Parse command-line arguments using clap (all optional)
// 3. Restore the frontier and the seen-set from disk
// 4. Crawl until the frontier is empty
// 5. Exit with proper code (0 = drained, 2 = fatal error)
//
// The crawl never exits on its own before it is done. Stopping it early is
// done by killing the process; the checkpoint makes that safe.
// =============================================================================

mod cli;
mod clock;
mod config;
mod crawl;
mod fetch;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use clock::TokioClock;
use config::CrawlConfig;
use crawl::{CheckpointFile, CrawlSummary, Crawler, Frontier, NameSink};
use fetch::{Fetcher, HttpEndpoint, RateGate};

// The #[tokio::main] attribute transforms our async main into a real main function
// It creates a tokio runtime and runs our async code inside it
#[tokio::main]
async fn main() {
    // Logging goes to stdout; RUST_LOG overrides the default "info" level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Run the crawl and turn the outcome into a process exit code
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            // Fatal errors (bad config, unwritable files) end the crawl
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// This is the main application logic
// Returns Ok(()) once the frontier is drained
async fn run() -> Result<()> {
    // Parse command-line arguments, then validate them into a typed config
    let cli = Cli::parse();
    let config = CrawlConfig::try_from(&cli)?;

    // Restore where a previous run stopped (or seed a fresh crawl)
    let checkpoint = CheckpointFile::new(&config.checkpoint);
    let frontier = Frontier::restore(&checkpoint, &config.alphabet)?;
    // Replay the output file so names found earlier are not written twice
    let sink = NameSink::open(&config.output)?;

    println!(
        "▶️ Resuming with {} prefixes. Already collected: {} names.",
        frontier.len(),
        sink.len()
    );
    tracing::info!(
        checkpoint = %checkpoint.path().display(),
        output = %config.output.display(),
        alphabet = %config.alphabet,
        page_cap = config.page_cap,
        "crawl configured"
    );
    if frontier.is_empty() {
        println!("✅ Checkpoint is drained, nothing left to query");
    }

    // Build the fetch stack: HTTP client -> rate gate -> retry policy
    let endpoint = HttpEndpoint::new(config.base_url.clone(), config.request_timeout)
        .context("Failed to create HTTP client")?;
    let gate = RateGate::new(config.rate_limit, config.time_window);
    let fetcher = Fetcher::new(endpoint, TokioClock, gate).with_policy(config.on_server_error);

    let mut crawler = Crawler::new(
        fetcher,
        frontier,
        checkpoint,
        sink,
        config.alphabet.clone(),
        config.page_cap,
    );
    // Blocks until every prefix has been explored
    let summary = crawler.run().await?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &CrawlSummary) {
    println!("\n🎉 Done! Total unique names: {}", summary.names_total);
    println!("📊 Summary:");
    println!("   🔎 Prefixes queried: {}", summary.queries);
    println!("   ➕ New names this run: {}", summary.names_added);
    println!("   📨 Requests sent: {}", summary.fetch.admitted);
    println!("   ⏳ Throttled: {}", summary.fetch.throttled);
    println!("   🌐 Network retries: {}", summary.fetch.transport_failures);
    println!("   ⏭️  Skipped on server error: {}", summary.fetch.skipped);
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why is everything sequential?
//    - The endpoint allows a fixed number of requests per minute
//    - Running queries in parallel would not finish any sooner
//    - One request at a time also keeps the traversal order deterministic
//
// 2. Why "{:#}" when printing the error?
//    - anyhow's alternate format prints the whole context chain on one line,
//      e.g. "Failed to append to all_names.csv: No space left on device"
//
// 3. Where do progress lines go?
//    - tracing's fmt layer writes to stdout; set RUST_LOG=debug to also see
//      every prefix as it completes
// -----------------------------------------------------------------------------
