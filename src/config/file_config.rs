use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub db_path: Option<String>,
    pub http_timeout_sec: Option<u64>,

    pub yields: Option<YieldsConfig>,
    pub routing: Option<RoutingConfig>,
    pub workflow: Option<WorkflowConfig>,
    /// Chain name to RPC URL.
    pub rpc: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct YieldsConfig {
    pub llama_api_base: Option<String>,
    pub yields_api_base: Option<String>,
    pub scores_url: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RoutingConfig {
    pub api_base: Option<String>,
    pub integrator: Option<String>,
    pub default_slippage: Option<f64>,
    pub status_poll_interval_secs: Option<u64>,
    pub status_max_polls: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct WorkflowConfig {
    pub mock_latency_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
