// src/fetch/endpoint.rs
// =============================================================================
// This module talks to the autocomplete endpoint over HTTP.
//
// Key functionality:
// - Sends GET <base-url>?query=<prefix> with a per-request timeout
// - Parses a 200 body as {"results": [...], "count": N}
// - Sorts every other outcome into a typed FetchError
//
// Nothing here retries or sleeps. Deciding what to do about an error is the
// Fetcher's job; this layer only reports what happened.
//
// Rust concepts:
// - Traits: The crawler depends on QueryEndpoint, not on reqwest directly
// - thiserror: Derives Display/Error for our error enum
// - serde(default): Missing JSON fields become empty values
// =============================================================================

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// What the endpoint said about one prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// Names matching the prefix (at most one page of them)
    #[serde(default)]
    pub results: Vec<String>,
    /// The endpoint's own count of returned results; equal to the page cap
    /// when the list was truncated
    #[serde(default)]
    pub count: usize,
}

impl QueryOutcome {
    /// The outcome used for a prefix that is skipped.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Ways a single query can fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// HTTP 429 from the endpoint
    #[error("throttled by endpoint (HTTP 429)")]
    Throttled,
    /// Any other non-success status
    #[error("HTTP {0}")]
    Status(u16),
    /// Timeout, refused connection, DNS failure and friends
    #[error("network error: {0}")]
    Transport(String),
    /// A 200 whose body was not the expected JSON
    #[error("malformed response body: {0}")]
    Decode(String),
}

/// Anything that can answer a prefix query.
#[async_trait]
pub trait QueryEndpoint: Send + Sync {
    async fn query(&self, prefix: &str) -> Result<QueryOutcome, FetchError>;
}

/// The real endpoint, reached with reqwest.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: Client,
    base_url: Url,
}

impl HttpEndpoint {
    pub fn new(base_url: Url, timeout: Duration) -> anyhow::Result<Self> {
        // One client for the whole crawl (connection pooling)
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl QueryEndpoint for HttpEndpoint {
    async fn query(&self, prefix: &str) -> Result<QueryOutcome, FetchError> {
        let response = self
            .client
            .get(self.base_url.clone())
            .query(&[("query", prefix)])
            .send()
            .await
            .map_err(categorize_error)?;

        if let Some(error) = classify_status(response.status()) {
            return Err(error);
        }

        let body = response.bytes().await.map_err(categorize_error)?;
        parse_body(&body)
    }
}

// Maps a status code to an error, or None when the body should be read.
//
// Only 200 carries the JSON body. Other 2xx codes (204 No Content and
// friends) have nothing to parse, so they go through the server-error
// policy like any other unexpected status instead of the retry path.
fn classify_status(status: StatusCode) -> Option<FetchError> {
    if status == StatusCode::OK {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Some(FetchError::Throttled)
    } else {
        Some(FetchError::Status(status.as_u16()))
    }
}

fn parse_body(body: &[u8]) -> Result<QueryOutcome, FetchError> {
    serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))
}

fn categorize_error(error: reqwest::Error) -> FetchError {
    let message = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    };
    FetchError::Transport(message)
}
