// src/config.rs
// =============================================================================
// Validated crawl settings.
//
// The CLI hands us raw numbers and strings; this module turns them into the
// typed configuration the rest of the crawler relies on, and refuses values
// that would make the crawl meaningless (an empty alphabet, a zero page cap).
// =============================================================================

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::cli::{Cli, ServerErrorPolicy};

/// Ordered, duplicate-free set of symbols that prefixes are built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet(Vec<char>);

impl Alphabet {
    pub fn symbols(&self) -> &[char] {
        &self.0
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self(('a'..='z').collect())
    }
}

impl FromStr for Alphabet {
    type Err = String;

    // Repeated symbols keep their first position
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut symbols: Vec<char> = Vec::new();
        for c in s.chars() {
            if !symbols.contains(&c) {
                symbols.push(c);
            }
        }

        if symbols.is_empty() {
            return Err("alphabet must contain at least one symbol".to_string());
        }

        Ok(Self(symbols))
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.0 {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Everything one crawl needs, already checked.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: Url,
    pub alphabet: Alphabet,
    /// Maximum results the endpoint returns per query; a full page means "go deeper".
    pub page_cap: usize,
    pub rate_limit: u32,
    pub time_window: Duration,
    pub request_timeout: Duration,
    pub checkpoint: PathBuf,
    pub output: PathBuf,
    pub on_server_error: ServerErrorPolicy,
}

impl TryFrom<&Cli> for CrawlConfig {
    type Error = anyhow::Error;

    fn try_from(cli: &Cli) -> Result<Self> {
        let base_url = Url::parse(&cli.base_url)
            .with_context(|| format!("Invalid base URL '{}'", cli.base_url))?;

        if cli.page_cap == 0 {
            bail!("--page-cap must be greater than zero");
        }
        if cli.rate_limit == 0 {
            bail!("--rate-limit must be greater than zero");
        }
        if cli.time_window == 0 {
            bail!("--time-window must be greater than zero");
        }
        // A zero timeout fails every request, which the fetcher retries forever
        if cli.request_timeout == 0 {
            bail!("--request-timeout must be greater than zero");
        }

        Ok(Self {
            base_url,
            alphabet: cli.alphabet.clone(),
            page_cap: cli.page_cap,
            rate_limit: cli.rate_limit,
            time_window: Duration::from_secs(cli.time_window),
            request_timeout: Duration::from_secs(cli.request_timeout),
            checkpoint: cli.checkpoint.clone(),
            output: cli.output.clone(),
            on_server_error: cli.on_server_error,
        })
    }
}
