//! Response shapes of the DefiLlama protocol and yield APIs.
//!
//! The upstream payloads are large and loosely typed; only the fields used
//! by the strategies catalog are modelled and nearly all of them are optional.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

fn number_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

/// Field names follow the upstream mix of snake and camel case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Number of audits as a string, e.g. `"2"`, or `"0"`.
    #[serde(default)]
    pub audits: Option<String>,
    #[serde(default)]
    pub audit_note: Option<String>,
    #[serde(default)]
    pub audit_links: Option<Vec<String>>,
    /// Unix seconds.
    #[serde(default, rename = "listedAt")]
    pub listed_at: Option<i64>,
    /// Current TVL on the list endpoint; the detail endpoint sends a time series instead.
    #[serde(default, deserialize_with = "number_or_none")]
    pub tvl: Option<f64>,
    /// Plain numbers on the list endpoint, nested objects on the detail endpoint.
    #[serde(default, rename = "chainTvls")]
    pub chain_tvls: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub change_1d: Option<f64>,
    #[serde(default)]
    pub change_7d: Option<f64>,
    #[serde(default)]
    pub mcap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolPredictions {
    #[serde(default)]
    pub predicted_class: Option<String>,
    #[serde(default)]
    pub predicted_probability: Option<f64>,
    #[serde(default)]
    pub binned_confidence: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    /// Pool id (UUID).
    pub pool: String,
    pub chain: String,
    pub project: String,
    pub symbol: String,
    #[serde(default)]
    pub tvl_usd: f64,
    #[serde(default)]
    pub apy: Option<f64>,
    #[serde(default)]
    pub apy_base: Option<f64>,
    #[serde(default)]
    pub apy_reward: Option<f64>,
    #[serde(default)]
    pub apy_mean30d: Option<f64>,
    #[serde(default)]
    pub stablecoin: bool,
    #[serde(default)]
    pub il_risk: Option<String>,
    #[serde(default)]
    pub exposure: Option<String>,
    #[serde(default)]
    pub pool_meta: Option<String>,
    #[serde(default)]
    pub pool_address: Option<String>,
    #[serde(default)]
    pub underlying_tokens: Option<Vec<String>>,
    #[serde(default)]
    pub reward_tokens: Option<Vec<String>>,
    #[serde(default)]
    pub volume_usd1d: Option<f64>,
    #[serde(default)]
    pub volume_usd7d: Option<f64>,
    #[serde(default)]
    pub predictions: Option<PoolPredictions>,
    /// Only present on the scores endpoint.
    #[serde(default)]
    pub security_score: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One point of a pool's APY/TVL history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalApy {
    pub timestamp: String,
    #[serde(default)]
    pub tvl_usd: Option<f64>,
    #[serde(default)]
    pub apy: Option<f64>,
    #[serde(default)]
    pub apy_base: Option<f64>,
    #[serde(default)]
    pub apy_reward: Option<f64>,
}

/// `{ "status": "...", "data": [...] }` envelope of the yields API.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: Option<Vec<T>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_detail_with_tvl_series_still_parses() {
        let json = r#"{
            "id": "111",
            "name": "Aave V3",
            "audits": "2",
            "audit_links": null,
            "listedAt": 1643155200,
            "tvl": [{ "date": 1643155200, "totalLiquidityUSD": 1000.0 }],
            "chainTvls": { "Ethereum": { "tvl": [] } }
        }"#;
        let protocol: Protocol = serde_json::from_str(json).unwrap();
        assert_eq!(protocol.tvl, None);
        assert_eq!(protocol.listed_at, Some(1643155200));
        assert_eq!(protocol.audits.as_deref(), Some("2"));
    }

    #[test]
    fn test_pool_parses_camel_case_fields() {
        let json = r#"{
            "pool": "747c1d2a-c668-4682-b9f9-296708a3dd90",
            "chain": "Ethereum",
            "project": "lido",
            "symbol": "STETH",
            "tvlUsd": 24000000000.0,
            "apy": 2.9,
            "apyMean30d": 3.1,
            "stablecoin": false,
            "underlyingTokens": ["0x0000000000000000000000000000000000000000"],
            "volumeUsd1d": null
        }"#;
        let pool: Pool = serde_json::from_str(json).unwrap();
        assert_eq!(pool.apy_mean30d, Some(3.1));
        assert_eq!(pool.volume_usd1d, None);
        assert_eq!(pool.underlying_tokens.map(|t| t.len()), Some(1));
    }
}
