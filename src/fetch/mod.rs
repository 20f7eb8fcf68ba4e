// src/fetch/mod.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub mod link;

pub use link::extract_export_link;

/// Default bound on a single export download.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retrieves the body behind an export link.
#[async_trait]
pub trait ExportFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Plain HTTP(S) GET with a fixed timeout and no retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ExportFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let url = Url::parse(url).with_context(|| format!("parsing export URL {}", url))?;
        debug!(%url, "downloading export");
        let bytes = self
            .client
            .get(url.as_str())
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Non-success status {}", url))?
            .bytes()
            .await
            .with_context(|| format!("reading body from {}", url))?;
        debug!(%url, bytes = bytes.len(), "downloaded export");
        Ok(bytes.to_vec())
    }
}
