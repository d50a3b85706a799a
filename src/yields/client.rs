//! HTTP client for the DefiLlama protocol and yield endpoints.
//!
//! Every public method degrades to "no data" (an empty list or `None`) on
//! any failure, after logging it.

use super::models::{DataEnvelope, HistoricalApy, Pool, Protocol};
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

pub const DEFAULT_LLAMA_API_BASE: &str = "https://api.llama.fi";
pub const DEFAULT_YIELDS_API_BASE: &str = "https://yields.llama.fi";

#[derive(Debug, Clone)]
pub struct YieldsClientConfig {
    pub llama_api_base: String,
    pub yields_api_base: String,
    /// Optional curated scores endpoint returning pools in the yields envelope.
    pub scores_url: Option<String>,
    pub timeout_sec: u64,
}

impl Default for YieldsClientConfig {
    fn default() -> Self {
        Self {
            llama_api_base: DEFAULT_LLAMA_API_BASE.to_string(),
            yields_api_base: DEFAULT_YIELDS_API_BASE.to_string(),
            scores_url: None,
            timeout_sec: 30,
        }
    }
}

#[derive(Clone)]
pub struct YieldsClient {
    client: Client,
    config: YieldsClientConfig,
}

impl YieldsClient {
    pub fn new(config: YieldsClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()?;
        Ok(Self { client, config })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Request to {} failed with status: {}",
                url,
                response.status()
            ));
        }

        response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from {}", url))
    }

    /// All protocols tracked by DefiLlama.
    pub async fn fetch_protocols(&self) -> Vec<Protocol> {
        let url = format!("{}/protocols", self.config.llama_api_base);
        match self.get_json(&url).await {
            Ok(protocols) => protocols,
            Err(e) => {
                error!("Error fetching protocols: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Details of a single protocol by slug.
    pub async fn fetch_protocol(&self, slug: &str) -> Option<Protocol> {
        let url = format!(
            "{}/protocol/{}",
            self.config.llama_api_base,
            urlencoding::encode(slug)
        );
        match self.get_json(&url).await {
            Ok(protocol) => Some(protocol),
            Err(e) => {
                error!("Error fetching protocol {}: {:#}", slug, e);
                None
            }
        }
    }

    /// All yield pools.
    pub async fn fetch_pools(&self) -> Vec<Pool> {
        let url = format!("{}/pools", self.config.yields_api_base);
        self.fetch_envelope(&url, "pools").await
    }

    /// Historical APY and TVL of one pool.
    pub async fn fetch_pool_history(&self, pool_id: &str) -> Vec<HistoricalApy> {
        let url = format!(
            "{}/chart/{}",
            self.config.yields_api_base,
            urlencoding::encode(pool_id)
        );
        self.fetch_envelope(&url, "pool history").await
    }

    /// Top pools from the curated scores endpoint, if one is configured.
    pub async fn fetch_top_pools(&self) -> Vec<Pool> {
        let Some(base) = &self.config.scores_url else {
            debug!("No scores endpoint configured");
            return Vec::new();
        };
        let url = format!("{}?limit=10&tokens=SUSDS", base);
        self.fetch_envelope(&url, "top pools").await
    }

    async fn fetch_envelope<T: DeserializeOwned>(&self, url: &str, what: &str) -> Vec<T> {
        match self.get_json::<DataEnvelope<T>>(url).await {
            Ok(envelope) => {
                let data = envelope.data.unwrap_or_default();
                debug!("Fetched {} {}", data.len(), what);
                data
            }
            Err(e) => {
                error!("Error fetching {}: {:#}", what, e);
                Vec::new()
            }
        }
    }
}
