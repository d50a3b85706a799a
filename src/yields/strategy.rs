//! Strategies catalog built from yield pools.

use super::client::YieldsClient;
use super::models::{Pool, PoolPredictions, Protocol};
use super::security_score::{calc_security_score, SecurityInput};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Number of pools turned into strategies by [`load_strategies`] by default.
pub const DEFAULT_STRATEGY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyCategory {
    Stablecoin,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub id: String,
    pub name: String,
    pub protocol: String,
    pub chain: String,
    pub pool_address: Option<String>,
    pub current_apy: f64,
    pub apy_mean_30d: f64,
    pub daily_yield: f64,
    pub tvl: String,
    pub tvl_numeric: f64,
    pub category: StrategyCategory,
    pub is_stablecoin: bool,
    pub audits: String,
    pub listed_at: Option<i64>,
    pub volume_24h: f64,
    pub underlying_symbols: Vec<String>,
    pub rugged: bool,
    pub safety_score: u8,
    pub predictions: Option<PoolPredictions>,
    pub url: Option<String>,
}

impl Strategy {
    pub fn security_input(&self) -> SecurityInput {
        SecurityInput {
            audits: self.audits.clone(),
            rugged: self.rugged,
            tvl: self.tvl_numeric,
            listed_at: self.listed_at,
            volume_24h: self.volume_24h,
            apy_history: Vec::new(),
            underlying_symbols: self.underlying_symbols.clone(),
        }
    }
}

/// `$1.23B`, `$4.56M`, `$7.89K` or `$12.00`.
pub fn format_tvl(tvl: f64) -> String {
    if tvl >= 1e9 {
        format!("${:.2}B", tvl / 1e9)
    } else if tvl >= 1e6 {
        format!("${:.2}M", tvl / 1e6)
    } else if tvl >= 1e3 {
        format!("${:.2}K", tvl / 1e3)
    } else {
        format!("${:.2}", tvl)
    }
}

pub fn transform_pool_to_strategy(pool: &Pool, protocol: Option<&Protocol>) -> Strategy {
    let underlying_symbols = pool
        .underlying_tokens
        .clone()
        .filter(|tokens| !tokens.is_empty())
        .unwrap_or_else(|| vec![pool.symbol.clone()]);
    let apy = pool.apy.unwrap_or(0.0);

    Strategy {
        id: pool.pool.clone(),
        name: format!("{} - {}", pool.symbol, pool.project),
        protocol: pool.project.clone(),
        chain: pool.chain.clone(),
        pool_address: pool.pool_address.clone(),
        current_apy: apy,
        apy_mean_30d: pool.apy_mean30d.unwrap_or(0.0),
        daily_yield: apy / 365.0,
        tvl: format_tvl(pool.tvl_usd),
        tvl_numeric: pool.tvl_usd,
        category: if pool.stablecoin {
            StrategyCategory::Stablecoin
        } else {
            StrategyCategory::Other
        },
        is_stablecoin: pool.stablecoin,
        audits: protocol
            .and_then(|p| p.audits.clone())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        listed_at: protocol.and_then(|p| p.listed_at),
        volume_24h: pool.volume_usd1d.unwrap_or(0.0),
        underlying_symbols,
        rugged: false,
        safety_score: pool
            .security_score
            .map(|s| s.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0),
        predictions: pool.predictions.clone(),
        url: pool.url.clone(),
    }
}

/// Chain, stablecoin and free-text filter over a strategy list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyFilter {
    /// Chains to keep, compared case-insensitively. Empty keeps all.
    pub chains: Vec<String>,
    pub stablecoins_only: bool,
    /// Case-insensitive match against name or protocol.
    pub search: String,
}

impl StrategyFilter {
    pub fn matches(&self, strategy: &Strategy) -> bool {
        let matches_chain = self.chains.is_empty()
            || self
                .chains
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&strategy.chain));
        let matches_stablecoins = !self.stablecoins_only || strategy.is_stablecoin;
        let query = self.search.trim().to_lowercase();
        let matches_search = query.is_empty()
            || strategy.name.to_lowercase().contains(&query)
            || strategy.protocol.to_lowercase().contains(&query);

        matches_chain && matches_stablecoins && matches_search
    }

    pub fn apply<'a>(&self, strategies: &'a [Strategy]) -> Vec<&'a Strategy> {
        strategies.iter().filter(|s| self.matches(s)).collect()
    }
}

/// Loads the first `limit` pools as scored strategies.
///
/// Pools and protocols are fetched concurrently; a pool's protocol is the one
/// whose name equals the pool's project, ignoring case.
pub async fn load_strategies(
    client: &YieldsClient,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<Strategy> {
    let (pools, protocols) = tokio::join!(client.fetch_pools(), client.fetch_protocols());
    info!(
        "Loaded {} pools and {} protocols",
        pools.len(),
        protocols.len()
    );

    pools
        .iter()
        .take(limit)
        .map(|pool| {
            let protocol = protocols
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(&pool.project));
            let mut strategy = transform_pool_to_strategy(pool, protocol);
            strategy.safety_score = calc_security_score(&strategy.security_input(), now);
            strategy
        })
        .collect()
}
