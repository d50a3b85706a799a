mod file_config;

pub use file_config::{FileConfig, RoutingConfig, WorkflowConfig, YieldsConfig};

use crate::adapters::DEFAULT_SLIPPAGE;
use crate::chain::{Chain, SUPPORTED_CHAINS};
use crate::routing::LifiConfig;
use crate::workflow::DEFAULT_MOCK_LATENCY;
use crate::yields::YieldsClientConfig;
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_FILE: &str = "defi-hub.db";

/// CLI arguments that take part in config resolution.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub http_timeout_sec: u64,
    pub slippage: Option<f64>,
    pub mock_latency_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub http_timeout_sec: u64,
    pub yields: YieldsClientConfig,
    pub routing: RoutingSettings,
    pub workflow: WorkflowSettings,
    /// RPC endpoint of every EVM chain.
    pub rpc_urls: HashMap<Chain, String>,
}

#[derive(Debug, Clone)]
pub struct RoutingSettings {
    pub lifi: LifiConfig,
    pub default_slippage: f64,
}

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub mock_latency: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            mock_latency: DEFAULT_MOCK_LATENCY,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let http_timeout_sec = file.http_timeout_sec.unwrap_or(cli.http_timeout_sec);
        if http_timeout_sec == 0 {
            bail!("http_timeout_sec must be greater than zero");
        }

        let yields_file = file.yields.unwrap_or_default();
        let yields_defaults = YieldsClientConfig::default();
        let yields = YieldsClientConfig {
            llama_api_base: yields_file
                .llama_api_base
                .unwrap_or(yields_defaults.llama_api_base),
            yields_api_base: yields_file
                .yields_api_base
                .unwrap_or(yields_defaults.yields_api_base),
            scores_url: yields_file.scores_url,
            timeout_sec: http_timeout_sec,
        };

        let routing_file = file.routing.unwrap_or_default();
        let lifi_defaults = LifiConfig::default();
        let default_slippage = routing_file
            .default_slippage
            .or(cli.slippage)
            .unwrap_or(DEFAULT_SLIPPAGE);
        if !(default_slippage > 0.0 && default_slippage < 1.0) {
            bail!(
                "Slippage must be between 0 and 1 (exclusive), got {}",
                default_slippage
            );
        }
        let routing = RoutingSettings {
            lifi: LifiConfig {
                api_base: routing_file.api_base.unwrap_or(lifi_defaults.api_base),
                integrator: routing_file.integrator.unwrap_or(lifi_defaults.integrator),
                timeout_sec: http_timeout_sec,
                status_poll_interval: routing_file
                    .status_poll_interval_secs
                    .map(Duration::from_secs)
                    .unwrap_or(lifi_defaults.status_poll_interval),
                status_max_polls: routing_file
                    .status_max_polls
                    .unwrap_or(lifi_defaults.status_max_polls),
            },
            default_slippage,
        };

        let workflow = WorkflowSettings {
            mock_latency: file
                .workflow
                .and_then(|w| w.mock_latency_ms)
                .or(cli.mock_latency_ms)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_MOCK_LATENCY),
        };

        let mut rpc_urls: HashMap<Chain, String> = SUPPORTED_CHAINS
            .iter()
            .filter_map(|info| {
                info.chain
                    .default_rpc_url()
                    .map(|url| (info.chain, url.to_string()))
            })
            .collect();
        for (name, url) in file.rpc.unwrap_or_default() {
            let chain = Chain::parse(&name)
                .filter(Chain::is_evm)
                .ok_or_else(|| anyhow!("[rpc] key {:?} is not a supported EVM chain", name))?;
            rpc_urls.insert(chain, url);
        }

        Ok(Self {
            db_path,
            http_timeout_sec,
            yields,
            routing,
            workflow,
            rpc_urls,
        })
    }
}
