//! Yield data: the DefiLlama client, the strategies catalog and pool
//! security scoring.

mod client;
mod models;
mod security_score;
mod strategy;

pub use client::{YieldsClient, YieldsClientConfig, DEFAULT_LLAMA_API_BASE, DEFAULT_YIELDS_API_BASE};
pub use models::{HistoricalApy, Pool, PoolPredictions, Protocol};
pub use security_score::{
    calc_security_score, calc_security_score_with_metrics, is_stablecoin, AgeRating, Level,
    Rating, SecurityInput, SecurityMetrics, TokenScore, VolatilityRating,
};
pub use strategy::{
    format_tvl, load_strategies, transform_pool_to_strategy, Strategy, StrategyCategory,
    StrategyFilter, DEFAULT_STRATEGY_LIMIT,
};
