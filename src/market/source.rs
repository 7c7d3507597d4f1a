//! Snapshot and settlement feeds
//!
//! Venue-specific clients live outside this crate; these implementations read
//! a normalized JSON listing either over HTTP or from a file.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::{MarketSnapshot, Settlement};

/// Feed failures
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request did not complete in time
    #[error("{source_name} timed out after {timeout:?}")]
    Timeout {
        source_name: String,
        timeout: Duration,
    },
    /// The circuit breaker for this source is open
    #[error("circuit open for {0}")]
    CircuitOpen(String),
    /// Transport or decoding failure
    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Transport(e.to_string())
    }
}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        SourceError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Transport(e.to_string())
    }
}

/// Supplies the current market catalog
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Name used in logs and the source-health report
    fn name(&self) -> &str;
    /// Fetch all currently open markets
    async fn fetch_markets(&self) -> Result<Vec<MarketSnapshot>, SourceError>;
}

/// Supplies final settlements
#[async_trait]
pub trait ResolutionFeed: Send + Sync {
    /// Name used in logs and the source-health report
    fn name(&self) -> &str;
    /// Settlement for a market, `None` while it is still live
    async fn fetch_settlement(&self, market_id: &str) -> Result<Option<Settlement>, SourceError>;
}

fn http_client(timeout: Duration) -> Result<Client, SourceError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Reads a JSON array of snapshots from an HTTP endpoint
pub struct HttpMarketSource {
    name: String,
    url: String,
    client: Client,
}

impl HttpMarketSource {
    /// Create a source for `url` with a per-request timeout
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            name: name.into(),
            url: url.into(),
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl MarketSource for HttpMarketSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_markets(&self) -> Result<Vec<MarketSnapshot>, SourceError> {
        tracing::debug!(url = %self.url, "Fetching market listing");

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Transport(format!("{} - {}", status, body)));
        }

        Ok(response.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct SettlementResponse {
    settlement: Option<Settlement>,
}

/// Queries `{base_url}/{market_id}` for `{"settlement": "yes" | "no" | "void" | null}`
pub struct HttpResolutionFeed {
    name: String,
    base_url: String,
    client: Client,
}

impl HttpResolutionFeed {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            name: name.into(),
            base_url: base_url.into(),
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl ResolutionFeed for HttpResolutionFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_settlement(&self, market_id: &str) -> Result<Option<Settlement>, SourceError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), market_id);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SourceError::Transport(format!("settlement lookup failed: {}", response.status())));
        }

        let body: SettlementResponse = response.json().await?;
        Ok(body.settlement)
    }
}

/// Reads a JSON array of snapshots from disk on every fetch
pub struct FileMarketSource {
    path: PathBuf,
}

impl FileMarketSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MarketSource for FileMarketSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_markets(&self) -> Result<Vec<MarketSnapshot>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Reads a JSON object of `market_id -> settlement` from disk
pub struct FileResolutionFeed {
    path: PathBuf,
}

impl FileResolutionFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ResolutionFeed for FileResolutionFeed {
    fn name(&self) -> &str {
        "file-settlements"
    }

    async fn fetch_settlement(&self, market_id: &str) -> Result<Option<Settlement>, SourceError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let settlements: HashMap<String, Settlement> = serde_json::from_str(&content)?;
        Ok(settlements.get(market_id).copied())
    }
}
